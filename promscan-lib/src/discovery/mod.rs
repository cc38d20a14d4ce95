//! Metric discovery over typed call-site facts.
//!
//! Discovery runs in two stages. The first walks every call site once, in the order the
//! units were supplied, classifying calls and collecting raw metrics and the namespace
//! configuration. The second runs only after the walk is over, because the configuration
//! may appear after metrics that depend on it: it normalizes names, applies the prefix,
//! drops duplicates and lays out panels.

mod assembler;
mod classifier;
mod context;
mod diagnostics;
mod error;
mod metric;
mod namespace;
mod normalize;

pub use assembler::{PANEL_WIDTH, PanelLayout, assemble, label_clause};
pub use classifier::{CallClass, classify};
pub use context::{DiscoveryContext, DiscoveryOptions, Observations};
pub use diagnostics::Diagnostic;
pub use error::ScanError;
pub use metric::{Metric, MetricKind, RawMetric};
pub use namespace::NamespaceConfig;
pub use normalize::{full_name, normalize_name, normalize_prefix};

use crate::facts::{FactSource, SourceUnit};

const LOG_TARGET: &str = " discovery";

/// Result of a successful discovery run.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub metrics: Vec<Metric>,
    pub config: NamespaceConfig,
    pub diagnostics: Vec<Diagnostic>,
}

/// Discover every metric emitted in `units`.
///
/// Fails when no configuration call exists or when no metric survives; nothing partial is
/// returned in either case. Malformed calls are reported in [`Discovery::diagnostics`].
pub fn discover(source: &dyn FactSource, units: &[SourceUnit], options: &DiscoveryOptions) -> Result<Discovery, ScanError> {
    let mut ctx = DiscoveryContext::new(source);
    for unit in units {
        ctx.observe_unit(unit);
    }

    let observations = ctx.finish(options)?;
    let metrics = assemble(&observations.raw_metrics, &observations.config);
    if metrics.is_empty() {
        return Err(ScanError::NoMetricsDiscovered);
    }

    for metric in &metrics {
        log::info!(target: LOG_TARGET, "{} => {}", metric.display_title, metric.full_name);
    }

    Ok(Discovery {
        metrics,
        config: observations.config,
        diagnostics: observations.diagnostics,
    })
}
