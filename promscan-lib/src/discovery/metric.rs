use strum::{Display, EnumIter, EnumString};

/// The shape of a metric, inferred from the name of the call that emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Errors,
    Gauge,
    Histogram,
    Timer,
    Summary,
}

/// Method-name prefixes and the kinds they select, checked in order.
const KIND_PREFIXES: [(&str, MetricKind); 6] = [
    ("Counter", MetricKind::Counter),
    ("Error", MetricKind::Errors),
    ("Gauge", MetricKind::Gauge),
    ("Histo", MetricKind::Histogram),
    ("Timer", MetricKind::Timer),
    ("Summary", MetricKind::Summary),
];

impl MetricKind {
    /// Infer the kind from an emission method name such as `CounterWithLabels` or `GaugeNow`.
    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        KIND_PREFIXES
            .iter()
            .find(|(prefix, _)| method.starts_with(prefix))
            .map(|(_, kind)| *kind)
    }
}

/// A metric as observed at its call site, before the namespace is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMetric {
    pub kind: Option<MetricKind>,
    pub call_name: String,
    pub raw_name: String,
    pub labels: Vec<String>,
    pub display_title: String,
    pub location: String,
}

/// A final metric record, unique by `full_name` and placed on the dashboard grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub normalized_name: String,
    pub full_name: String,
    pub kind: Option<MetricKind>,
    pub labels: Vec<String>,

    /// `by (a,b)` for labeled counters, empty otherwise.
    pub label_clause: String,
    pub display_title: String,
    pub panel_column: u32,
    pub panel_id: u32,
}
