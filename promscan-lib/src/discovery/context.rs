use super::classifier::{CallClass, classify};
use super::metric::{MetricKind, RawMetric};
use super::namespace::{self, NamespaceConfig};
use super::{Diagnostic, ScanError};
use crate::facts::{ArgExpr, CallSite, FactSource, SourceUnit};
use core::fmt::{Debug, Formatter};

const LOG_TARGET: &str = " discovery";

const SINGLE_LABEL_METHOD: &str = "CounterWithLabel";
const LABEL_LIST_METHOD: &str = "CounterWithLabels";

/// Settings for a discovery run.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Prefix used when the configuration call does not set one.
    pub default_prefix: Option<String>,

    /// Reject runs with more than one configuration call instead of keeping the last.
    pub strict_config: bool,
}

/// What the traversal produced: metrics in discovery order plus the final namespace.
#[derive(Debug, Clone)]
pub struct Observations {
    pub config: NamespaceConfig,
    pub raw_metrics: Vec<RawMetric>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run-scoped state of the single pass over all call sites.
pub struct DiscoveryContext<'a> {
    source: &'a dyn FactSource,
    config: NamespaceConfig,
    config_locations: Vec<String>,
    errors_seen: bool,
    raw_metrics: Vec<RawMetric>,
    diagnostics: Vec<Diagnostic>,
}

impl Debug for DiscoveryContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DiscoveryContext")
            .field("source", &self.source.describe())
            .field("config", &self.config)
            .field("raw_metrics", &self.raw_metrics.len())
            .finish_non_exhaustive()
    }
}

impl<'a> DiscoveryContext<'a> {
    pub fn new(source: &'a dyn FactSource) -> Self {
        Self {
            source,
            config: NamespaceConfig::default(),
            config_locations: Vec::new(),
            errors_seen: false,
            raw_metrics: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn observe_unit(&mut self, unit: &SourceUnit) {
        log::info!(target: LOG_TARGET, "Examining {}", unit.name);
        for site in &unit.call_sites {
            self.observe(site);
        }
    }

    pub fn observe(&mut self, site: &CallSite) {
        match classify(site, self.source) {
            CallClass::Emission => match self.raw_metric(site) {
                Ok(Some(metric)) => {
                    log::debug!(target: LOG_TARGET, "{} '{}' at {}", metric.call_name, metric.raw_name, metric.location);
                    self.raw_metrics.push(metric);
                }
                Ok(None) => {}
                Err(e) => self.skip(e),
            },
            CallClass::Configuration => match namespace::extract(site) {
                Ok(config) => self.configure(config, &site.location),
                Err(e) => self.skip(e),
            },
            CallClass::Ignored => {}
        }
    }

    /// End the traversal.
    pub fn finish(self, options: &DiscoveryOptions) -> Result<Observations, ScanError> {
        match self.config_locations.len() {
            0 => return Err(ScanError::ConfigurationNotFound),
            1 => {}
            count if options.strict_config => return Err(ScanError::AmbiguousConfiguration { count }),
            count => {
                log::warn!(target: LOG_TARGET, "Found {count} metrics configuration calls, using the last one");
            }
        }

        let mut config = self.config;
        if config.prefix.is_empty()
            && let Some(prefix) = &options.default_prefix
        {
            log::debug!(target: LOG_TARGET, "No metric prefix configured, using default '{prefix}'");
            config.prefix.clone_from(prefix);
        }

        Ok(Observations {
            config,
            raw_metrics: self.raw_metrics,
            diagnostics: self.diagnostics,
        })
    }

    fn configure(&mut self, config: NamespaceConfig, location: &str) {
        if let Some(previous) = self.config_locations.last() {
            self.diagnostics.push(Diagnostic::ConfigurationReplaced {
                previous: previous.clone(),
                location: location.to_string(),
            });
        }

        log::debug!(target: LOG_TARGET, "Metrics configuration at {location}: prefix '{}'", config.prefix);
        self.config = config;
        self.config_locations.push(location.to_string());
    }

    fn skip(&mut self, error: ScanError) {
        log::warn!(target: LOG_TARGET, "Skipping call: {error}");
        self.diagnostics.push(Diagnostic::Skipped(error));
    }

    /// Build the raw metric for an emission call, or `None` for a repeated errors call.
    fn raw_metric(&mut self, site: &CallSite) -> Result<Option<RawMetric>, ScanError> {
        let raw_name = match site.args.first() {
            Some(ArgExpr::String { value }) => value.trim().to_string(),
            Some(other) => return Err(malformed(site, format!("metric name must be a string literal, found a {}", other.shape()))),
            None => return Err(malformed(site, "no metric name argument".to_string())),
        };

        let kind = MetricKind::from_method(&site.method);
        let labels = labels(site)?;

        if kind == Some(MetricKind::Errors) {
            if self.errors_seen {
                log::debug!(target: LOG_TARGET, "Ignoring additional errors metric '{raw_name}' at {}", site.location);
                return Ok(None);
            }
            self.errors_seen = true;
        }

        Ok(Some(RawMetric {
            kind,
            call_name: site.method.clone(),
            display_title: raw_name.clone(),
            raw_name,
            labels,
            location: site.location.clone(),
        }))
    }
}

fn labels(site: &CallSite) -> Result<Vec<String>, ScanError> {
    let method = site.method.as_str();
    if method != SINGLE_LABEL_METHOD && method != LABEL_LIST_METHOD {
        return Ok(Vec::new());
    }

    let Some(arg) = site.args.get(1) else {
        return Err(malformed(site, format!("'{method}' has no label argument")));
    };

    if method == SINGLE_LABEL_METHOD {
        return arg
            .as_str()
            .map(|label| vec![label.trim().to_string()])
            .ok_or_else(|| malformed(site, format!("label must be a string literal, found a {}", arg.shape())));
    }

    let Some(entries) = arg.as_composite() else {
        return Err(malformed(site, format!("labels must be a list literal, found a {}", arg.shape())));
    };

    entries
        .iter()
        .map(|entry| {
            entry
                .value
                .as_str()
                .map(|label| label.trim().to_string())
                .ok_or_else(|| malformed(site, format!("each label must be a string literal, found a {}", entry.value.shape())))
        })
        .collect()
}

fn malformed(site: &CallSite, detail: String) -> ScanError {
    ScanError::MalformedLiteralArgument {
        location: site.location.clone(),
        detail: format!("'{}': {detail}", site.method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{FactsFile, InstrumentationApi, ReceiverShape};

    const TY: &str = "*github.com/poblish/promenade/api.PrometheusMetrics";

    fn source() -> FactsFile {
        FactsFile::new("facts.json", InstrumentationApi::default())
    }

    fn emit(method: &str, args: Vec<ArgExpr>) -> CallSite {
        let mut site = CallSite::new(method).receiver(TY, ReceiverShape::Direct).at(format!("svc.go:{}", args.len()));
        site.args = args;
        site
    }

    fn configure(prefix: &str) -> CallSite {
        CallSite::new("NewMetrics")
            .returning(TY)
            .arg(ArgExpr::keyed([("MetricNamePrefix", ArgExpr::string(prefix))]))
            .at("main.go:1")
    }

    fn run(sites: &[CallSite], options: &DiscoveryOptions) -> Result<Observations, ScanError> {
        let source = source();
        let mut ctx = DiscoveryContext::new(&source);
        ctx.observe_unit(&SourceUnit::new("svc", sites.to_vec()));
        ctx.finish(options)
    }

    #[test]
    fn test_configuration_not_found() {
        let err = run(&[emit("Counter", vec![ArgExpr::string("a")])], &DiscoveryOptions::default()).unwrap_err();
        assert_eq!(err, ScanError::ConfigurationNotFound);
    }

    #[test]
    fn test_configuration_after_metrics() {
        let obs = run(&[emit("Counter", vec![ArgExpr::string("a")]), configure("late")], &DiscoveryOptions::default()).unwrap();
        assert_eq!(obs.config.prefix, "late");
        assert_eq!(obs.raw_metrics.len(), 1);
    }

    #[test]
    fn test_last_configuration_wins() {
        let obs = run(&[configure("first"), configure("second")], &DiscoveryOptions::default()).unwrap();
        assert_eq!(obs.config.prefix, "second");
        assert!(matches!(obs.diagnostics[0], Diagnostic::ConfigurationReplaced { .. }));
    }

    #[test]
    fn test_strict_config_rejects_multiple() {
        let options = DiscoveryOptions {
            strict_config: true,
            ..DiscoveryOptions::default()
        };
        let err = run(&[configure("first"), configure("second")], &options).unwrap_err();
        assert_eq!(err, ScanError::AmbiguousConfiguration { count: 2 });
    }

    #[test]
    fn test_default_prefix_fills_missing_prefix() {
        let options = DiscoveryOptions {
            default_prefix: Some("fallback".to_string()),
            ..DiscoveryOptions::default()
        };
        let bare = CallSite::new("NewMetrics").returning(TY).arg(ArgExpr::keyed(Vec::<(String, ArgExpr)>::new()));
        assert_eq!(run(&[bare], &options).unwrap().config.prefix, "fallback");
        assert_eq!(run(&[configure("svc")], &options).unwrap().config.prefix, "svc");
    }

    #[test]
    fn test_only_first_errors_call_kept() {
        let mut sites = vec![configure("svc")];
        for i in 0..5 {
            sites.push(emit("Error", vec![ArgExpr::string(format!("failures{i}"))]));
        }

        let obs = run(&sites, &DiscoveryOptions::default()).unwrap();
        assert_eq!(obs.raw_metrics.len(), 1);
        assert_eq!(obs.raw_metrics[0].raw_name, "failures0");
        assert_eq!(obs.raw_metrics[0].kind, Some(MetricKind::Errors));
    }

    #[test]
    fn test_labels() {
        let sites = [
            configure("svc"),
            emit("CounterWithLabel", vec![ArgExpr::string("a"), ArgExpr::string("region")]),
            emit("CounterWithLabels", vec![ArgExpr::string("b"), ArgExpr::string_list(["region", "env"])]),
            emit("Counter", vec![ArgExpr::string("c"), ArgExpr::string("ignored")]),
        ];

        let obs = run(&sites, &DiscoveryOptions::default()).unwrap();
        assert_eq!(obs.raw_metrics[0].labels, ["region"]);
        assert_eq!(obs.raw_metrics[1].labels, ["region", "env"]);
        assert!(obs.raw_metrics[2].labels.is_empty());
    }

    #[test]
    fn test_malformed_calls_are_skipped() {
        let sites = [
            configure("svc"),
            emit("Counter", vec![ArgExpr::Other]),
            emit("CounterWithLabels", vec![ArgExpr::string("b"), ArgExpr::string("region")]),
            emit("Gauge", Vec::new()),
            emit("Gauge", vec![ArgExpr::string("depth")]),
        ];

        let obs = run(&sites, &DiscoveryOptions::default()).unwrap();
        assert_eq!(obs.raw_metrics.len(), 1);
        assert_eq!(obs.raw_metrics[0].raw_name, "depth");
        assert_eq!(obs.diagnostics.iter().filter(|d| d.is_skip()).count(), 3);
    }

    #[test]
    fn test_malformed_configuration_does_not_count() {
        let bad = CallSite::new("NewMetrics").returning(TY).arg(ArgExpr::Other);
        let err = run(&[bad, emit("Counter", vec![ArgExpr::string("a")])], &DiscoveryOptions::default()).unwrap_err();
        assert_eq!(err, ScanError::ConfigurationNotFound);
    }

    #[test]
    fn test_malformed_errors_call_does_not_consume_slot() {
        let sites = [
            configure("svc"),
            emit("Error", vec![ArgExpr::Other]),
            emit("Error", vec![ArgExpr::string("failures")]),
        ];

        let obs = run(&sites, &DiscoveryOptions::default()).unwrap();
        assert_eq!(obs.raw_metrics.len(), 1);
        assert_eq!(obs.raw_metrics[0].raw_name, "failures");
    }

    #[test]
    fn test_unknown_kind_still_recorded() {
        let obs = run(&[configure("svc"), emit("Record", vec![ArgExpr::string("thing")])], &DiscoveryOptions::default()).unwrap();
        assert_eq!(obs.raw_metrics[0].kind, None);
        assert_eq!(obs.raw_metrics[0].display_title, "thing");
    }
}
