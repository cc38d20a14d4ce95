use super::query::{self, RATE_WINDOW};
use crate::Result;
use crate::discovery::{Metric, MetricKind, ScanError};
use clap::ValueEnum;
use core::fmt::Write;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use strum::{Display, EnumString};

const ERRORS_FOR: &str = "5m";
const ABSENT_FOR: &str = "10m";
const OPERATOR_API_VERSION: &str = "monitoring.coreos.com/v1";
const OPERATOR_KIND: &str = "PrometheusRule";

/// Layout of the alert rules document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum AlertDialect {
    /// A plain Prometheus rules file, as loaded by Prometheus and routed through Alertmanager.
    #[default]
    #[strum(serialize = "alertManager")]
    AlertManager,

    /// A `PrometheusRule` custom resource for the Prometheus operator.
    #[strum(serialize = "operator")]
    Operator,
}

impl AlertDialect {
    /// Resolve a dialect name, as given on the command line or in the state file.
    pub fn parse(name: &str) -> Result<Self, ScanError> {
        Self::from_str(name).map_err(|_unknown| ScanError::UnsupportedOutputDialect(name.to_string()))
    }
}

/// Which metrics get an alert rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display, EnumString, Serialize, Deserialize)]
#[value(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertScope {
    /// Every metric with a known kind
    #[default]
    All,

    /// Only the errors metric
    Errors,
}

/// Rule-level settings.
#[derive(Debug, Clone, Default)]
pub struct AlertSettings {
    pub dialect: AlertDialect,
    pub scope: AlertScope,

    /// Rule group name, also the custom resource name in the operator dialect.
    pub group_name: String,

    /// Static labels added to every rule.
    pub extra_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    pub alert: String,
    pub expr: String,
    #[serde(rename = "for")]
    pub for_duration: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    pub rules: Vec<AlertRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesFile {
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusRule {
    pub api_version: String,
    pub kind: String,
    pub metadata: ResourceMetadata,
    pub spec: RulesFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Build the rules for `metrics`, in metric order.
///
/// Alert names are unique within the result. A name already taken by an earlier rule gets the
/// metric's panel id appended.
#[must_use]
pub fn rules(metrics: &[Metric], settings: &AlertSettings) -> Vec<AlertRule> {
    let mut taken = HashSet::new();
    metrics
        .iter()
        .filter(|m| settings.scope == AlertScope::All || m.kind == Some(MetricKind::Errors))
        .filter_map(|m| {
            let mut alert_rule = rule(m, &settings.extra_labels)?;
            if !taken.insert(alert_rule.alert.clone()) {
                alert_rule.alert = format!("{}{}", alert_rule.alert, m.panel_id);
                let _ = taken.insert(alert_rule.alert.clone());
            }
            Some(alert_rule)
        })
        .collect()
}

fn rule(metric: &Metric, extra_labels: &BTreeMap<String, String>) -> Option<AlertRule> {
    let kind = metric.kind?;
    let name = alert_name(&metric.normalized_name);
    let full_name = &metric.full_name;

    let (alert, expr, for_duration, severity, summary) = if kind == MetricKind::Errors {
        (
            format!("{name}ErrorsRising"),
            format!("sum(rate({full_name}[{RATE_WINDOW}])) > 0"),
            ERRORS_FOR,
            "warning",
            format!("Errors reported through {full_name}"),
        )
    } else {
        (
            format!("{name}Absent"),
            format!("absent({})", query::presence_selector(metric)?),
            ABSENT_FOR,
            "info",
            format!("{kind} {full_name} is not being reported"),
        )
    };

    let mut labels = extra_labels.clone();
    let _ = labels.insert("severity".to_string(), severity.to_string());

    let mut annotations = BTreeMap::new();
    let _ = annotations.insert("summary".to_string(), summary);

    Some(AlertRule {
        alert,
        expr,
        for_duration: for_duration.to_string(),
        labels,
        annotations,
    })
}

/// `queue_depth` becomes `QueueDepth`.
fn alert_name(normalized_name: &str) -> String {
    normalized_name
        .split(|c: char| c == '_' || c == ':')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                let mut word: String = first.to_uppercase().collect();
                word.push_str(chars.as_str());
                word
            })
        })
        .collect()
}

/// Write the rules for `metrics` as YAML in the selected dialect.
///
/// Returns the number of rules written.
pub fn generate<W: Write>(metrics: &[Metric], settings: &AlertSettings, writer: &mut W) -> Result<usize> {
    let rules = rules(metrics, settings);
    let count = rules.len();
    let groups = vec![RuleGroup {
        name: settings.group_name.clone(),
        rules,
    }];

    let yaml = match settings.dialect {
        AlertDialect::AlertManager => serde_yaml::to_string(&RulesFile { groups })?,
        AlertDialect::Operator => serde_yaml::to_string(&PrometheusRule {
            api_version: OPERATOR_API_VERSION.to_string(),
            kind: OPERATOR_KIND.to_string(),
            metadata: ResourceMetadata {
                name: settings.group_name.replace('_', "-"),
                labels: settings.extra_labels.clone(),
            },
            spec: RulesFile { groups },
        })?,
    };

    write!(writer, "{yaml}")?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(name: &str, kind: Option<MetricKind>) -> Metric {
        Metric {
            normalized_name: name.to_string(),
            full_name: format!("orders_{name}"),
            kind,
            labels: Vec::new(),
            label_clause: String::new(),
            display_title: name.to_string(),
            panel_column: 0,
            panel_id: 1,
        }
    }

    fn settings(dialect: AlertDialect) -> AlertSettings {
        let mut extra_labels = BTreeMap::new();
        let _ = extra_labels.insert("team".to_string(), "payments".to_string());
        AlertSettings {
            dialect,
            scope: AlertScope::All,
            group_name: "orders".to_string(),
            extra_labels,
        }
    }

    fn sample() -> Vec<Metric> {
        vec![
            metric("created", Some(MetricKind::Counter)),
            metric("queue_depth", Some(MetricKind::Gauge)),
            metric("failures", Some(MetricKind::Errors)),
            metric("latency", Some(MetricKind::Summary)),
            metric("mystery", None),
        ]
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(AlertDialect::parse("alertManager").unwrap(), AlertDialect::AlertManager);
        assert_eq!(AlertDialect::parse("operator").unwrap(), AlertDialect::Operator);
        assert_eq!(
            AlertDialect::parse("thanos").unwrap_err(),
            ScanError::UnsupportedOutputDialect("thanos".to_string())
        );
        assert_eq!(AlertDialect::Operator.to_string(), "operator");
        assert_eq!(AlertDialect::AlertManager.to_string(), "alertManager");
    }

    #[test]
    fn test_rules_per_kind() {
        let rules = rules(&sample(), &settings(AlertDialect::AlertManager));
        assert_eq!(rules.len(), 4);

        assert_eq!(rules[0].alert, "CreatedAbsent");
        assert_eq!(rules[0].expr, "absent(orders_created)");
        assert_eq!(rules[0].for_duration, "10m");
        assert_eq!(rules[0].labels["severity"], "info");
        assert_eq!(rules[0].labels["team"], "payments");

        assert_eq!(rules[1].alert, "QueueDepthAbsent");

        assert_eq!(rules[2].alert, "FailuresErrorsRising");
        assert_eq!(rules[2].expr, "sum(rate(orders_failures[5m])) > 0");
        assert_eq!(rules[2].for_duration, "5m");
        assert_eq!(rules[2].labels["severity"], "warning");

        assert_eq!(rules[3].expr, "absent(orders_latency_count)");
    }

    #[test]
    fn test_errors_scope() {
        let mut settings = settings(AlertDialect::AlertManager);
        settings.scope = AlertScope::Errors;

        let rules = rules(&sample(), &settings);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].alert, "FailuresErrorsRising");
    }

    #[test]
    fn test_alert_manager_document() {
        let mut out = String::new();
        let count = generate(&sample(), &settings(AlertDialect::AlertManager), &mut out).unwrap();
        assert_eq!(count, 4);

        let doc: RulesFile = serde_yaml::from_str(&out).unwrap();
        assert_eq!(doc.groups.len(), 1);
        assert_eq!(doc.groups[0].name, "orders");
        assert_eq!(doc.groups[0].rules.len(), 4);
        assert!(out.contains("for: 10m"));
    }

    #[test]
    fn test_operator_document() {
        let mut out = String::new();
        let _ = generate(&sample(), &settings(AlertDialect::Operator), &mut out).unwrap();

        let doc: PrometheusRule = serde_yaml::from_str(&out).unwrap();
        assert_eq!(doc.api_version, "monitoring.coreos.com/v1");
        assert_eq!(doc.kind, "PrometheusRule");
        assert_eq!(doc.metadata.name, "orders");
        assert_eq!(doc.metadata.labels["team"], "payments");
        assert_eq!(doc.spec.groups[0].rules.len(), 4);
        assert!(out.contains("apiVersion: monitoring.coreos.com/v1"));
    }

    #[test]
    fn test_alert_names_stay_unique() {
        let mut first = metric("QueueDepth", Some(MetricKind::Gauge));
        first.panel_id = 1;
        let mut second = metric("queue_depth", Some(MetricKind::Gauge));
        second.panel_id = 2;

        let rules = rules(&[first, second], &settings(AlertDialect::AlertManager));
        assert_eq!(rules[0].alert, "QueueDepthAbsent");
        assert_eq!(rules[1].alert, "QueueDepthAbsent2");
    }

    #[test]
    fn test_alert_name() {
        assert_eq!(alert_name("queue_depth"), "QueueDepth");
        assert_eq!(alert_name("Requests"), "Requests");
        assert_eq!(alert_name("a__b"), "AB");
    }
}
