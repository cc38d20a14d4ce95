//! Artifact synthesis from a discovered metric list.
//!
//! Every generator is a pure renderer over `&[Metric]` plus its settings. None of them
//! revisits classification, normalization or deduplication; ids, columns and full names
//! are taken as given.
//!
//! - **Dashboard**: Grafana dashboard JSON, one time series panel per metric
//! - **Alerts**: Prometheus alerting rules as YAML, as a rules file or a `PrometheusRule` resource
//! - **Summary**: alert and metric counts as YAML
//! - **Console**: a colored listing for the terminal

mod alerts;
mod console;
mod dashboard;
mod query;
mod summary;

pub use alerts::{
    AlertDialect, AlertRule, AlertScope, AlertSettings, PrometheusRule, RuleGroup, RulesFile, generate as generate_alerts, rules,
};
pub use console::generate as generate_console;
pub use dashboard::{DashboardSettings, dashboard, generate as generate_dashboard};
pub use query::{expression, presence_selector};
pub use summary::{MetricsLabelsSummary, generate as generate_summary};
