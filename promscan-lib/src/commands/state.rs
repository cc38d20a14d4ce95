use crate::Result;
use crate::facts::InstrumentationApi;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{EnrichableExt, IntoAppError, app_err, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;

const LOG_TARGET: &str = "     state";

/// Name of the run-state file, looked up in the source directory.
pub const STATE_FILE_NAME: &str = ".promscan_state";

pub const DEFAULT_RULES_FILE_NAME: &str = "alert_rules.yaml";
pub const DEFAULT_DASHBOARD_FILE_NAME: &str = "grafana_dashboard.json";

/// The commented run-state template written by `init`, embedded from `default_state.yaml`
pub const DEFAULT_STATE_YAML: &str = include_str!("../../default_state.yaml");

/// Settings persisted between runs by whatever tooling drives promscan.
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunState {
    pub source_path: Option<Utf8PathBuf>,
    pub generated_chart_dir: Option<Utf8PathBuf>,
    pub default_package: Option<String>,
    pub default_metrics_prefix: Option<String>,
    pub rules_output_format: Option<String>,
    pub metrics_labels_path: Option<Utf8PathBuf>,
    pub dashboard_uid_override: Option<String>,
    pub dashboard_title_override: Option<String>,
    pub dashboard_tags: Vec<String>,

    /// `key=value` pairs.
    pub alert_extra_labels: Vec<String>,

    pub external_metric_names: Vec<String>,
    pub instrumentation: InstrumentationApi,
}

impl RunState {
    /// Load the state file from `dir`, or an empty state if there is none.
    pub fn load(dir: &Utf8Path) -> Result<Self> {
        let path = dir.join(STATE_FILE_NAME);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(target: LOG_TARGET, "No run state at '{path}'");
                return Ok(Self::default());
            }
            Err(e) => return Err(e).into_app_err_with(|| format!("reading run state '{path}'")),
        };

        let state = Self::parse(&text).map_err(|e| e.enrich_with(|| format!("parsing run state '{path}'")))?;
        log::info!(target: LOG_TARGET, "Loaded run state from '{path}'");
        Ok(state)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let state: Self = serde_yaml::from_str(text)?;
        state.validate()?;
        Ok(state)
    }

    /// Write the commented template to `output_path`.
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_STATE_YAML).into_app_err_with(|| format!("writing default run state to {output_path}"))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let api = &self.instrumentation;
        if api.type_path.trim().is_empty() || api.constructor.trim().is_empty() {
            bail!("instrumentation type_path and constructor must not be empty");
        }

        let _ = parse_extra_labels(&self.alert_extra_labels)?;
        Ok(())
    }

    pub fn source_path(&self) -> Option<&Utf8Path> {
        self.source_path.as_deref().filter(|p| !p.as_str().is_empty())
    }

    pub fn default_package(&self) -> Option<&str> {
        non_empty(self.default_package.as_deref())
    }

    pub fn default_metrics_prefix(&self) -> Option<&str> {
        non_empty(self.default_metrics_prefix.as_deref())
    }

    pub fn rules_output_format(&self) -> Option<&str> {
        non_empty(self.rules_output_format.as_deref())
    }

    pub fn metrics_labels_path(&self) -> Option<&Utf8Path> {
        self.metrics_labels_path.as_deref().filter(|p| !p.as_str().is_empty())
    }

    pub fn dashboard_uid(&self) -> Option<&str> {
        non_empty(self.dashboard_uid_override.as_deref())
    }

    pub fn dashboard_title(&self) -> Option<&str> {
        non_empty(self.dashboard_title_override.as_deref())
    }

    /// Default alert rules location: beside the chart templates when a chart dir is known.
    pub fn default_rules_path(&self) -> Utf8PathBuf {
        self.chart_dir().map_or_else(
            || Utf8PathBuf::from(DEFAULT_RULES_FILE_NAME),
            |dir| dir.join("includes").join("prometheus-rules").join(DEFAULT_RULES_FILE_NAME),
        )
    }

    pub fn default_dashboard_path(&self) -> Utf8PathBuf {
        self.chart_dir().map_or_else(
            || Utf8PathBuf::from(DEFAULT_DASHBOARD_FILE_NAME),
            |dir| dir.join("includes").join("dashboards").join(DEFAULT_DASHBOARD_FILE_NAME),
        )
    }

    fn chart_dir(&self) -> Option<&Utf8Path> {
        self.generated_chart_dir.as_deref().filter(|p| !p.as_str().is_empty())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse `key=value` pairs into a label map. Later keys replace earlier ones.
pub fn parse_extra_labels(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut labels = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| app_err!("invalid alert label '{pair}': expected key=value"))?;

        let key = key.trim();
        if key.is_empty() {
            bail!("invalid alert label '{pair}': the key is empty");
        }

        let _ = labels.insert(key.to_string(), value.trim().to_string());
    }

    Ok(labels)
}
