use super::metric::{Metric, RawMetric};
use super::namespace::NamespaceConfig;
use super::normalize::{full_name, normalize_name, normalize_prefix};
use std::collections::HashSet;

/// Width of a dashboard panel on the 24-unit Grafana grid.
pub const PANEL_WIDTH: u32 = 12;

/// Turn raw metrics into final records under the finished namespace configuration.
///
/// Discovery order is preserved. A metric whose full name was already produced is dropped.
/// Survivors get panel ids 1, 2, 3… and alternate between the two grid columns.
#[must_use]
pub fn assemble(raw_metrics: &[RawMetric], config: &NamespaceConfig) -> Vec<Metric> {
    let prefix = normalize_prefix(&config.prefix);
    let mut seen = HashSet::new();
    let mut layout = PanelLayout::default();
    let mut metrics = Vec::new();

    for raw in raw_metrics {
        let normalized_name = normalize_name(&raw.raw_name, config.case_sensitive);
        let full_name = full_name(&prefix, &config.separator, &normalized_name);

        if !seen.insert(full_name.clone()) {
            continue;
        }

        let labels: Vec<String> = raw.labels.iter().map(|l| normalize_name(l, config.case_sensitive)).collect();
        let (panel_id, panel_column) = layout.next_slot();

        metrics.push(Metric {
            normalized_name,
            full_name,
            kind: raw.kind,
            label_clause: label_clause(&labels),
            labels,
            display_title: raw.display_title.clone(),
            panel_column,
            panel_id,
        });
    }

    metrics
}

/// `by (a,b)` for a non-empty label list.
#[must_use]
pub fn label_clause(labels: &[String]) -> String {
    if labels.is_empty() {
        String::new()
    } else {
        format!("by ({})", labels.join(","))
    }
}

/// Sequential panel ids with columns alternating 0, 12, 0, 12…
#[derive(Debug, Clone)]
pub struct PanelLayout {
    next_id: u32,
    next_column: u32,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self { next_id: 1, next_column: 0 }
    }
}

impl PanelLayout {
    /// Continue the sequence after the given metrics.
    #[must_use]
    pub fn after(metrics: &[Metric]) -> Self {
        let mut layout = Self::default();
        for _ in metrics {
            let _ = layout.next_slot();
        }
        layout
    }

    /// Claim the next `(panel_id, panel_column)`.
    pub const fn next_slot(&mut self) -> (u32, u32) {
        let slot = (self.next_id, self.next_column);
        self.next_id += 1;
        self.next_column = PANEL_WIDTH - self.next_column;
        slot
    }
}
