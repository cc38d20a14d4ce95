//! PromQL derived from a metric's kind.

use crate::discovery::{Metric, MetricKind};

/// Range used by every `rate()` expression.
pub const RATE_WINDOW: &str = "5m";

/// Quantile plotted for histograms, timers and summaries.
pub const QUANTILE: &str = "0.95";

/// The dashboard query for a metric, or `None` when its kind is unknown.
#[must_use]
pub fn expression(metric: &Metric) -> Option<String> {
    let name = &metric.full_name;
    let query = match metric.kind? {
        MetricKind::Counter if !metric.label_clause.is_empty() => {
            format!("sum(rate({name}[{RATE_WINDOW}])) {}", metric.label_clause)
        }
        MetricKind::Counter | MetricKind::Errors => format!("sum(rate({name}[{RATE_WINDOW}]))"),
        MetricKind::Gauge => name.clone(),
        MetricKind::Histogram | MetricKind::Timer => {
            format!("histogram_quantile({QUANTILE}, sum(rate({name}_bucket[{RATE_WINDOW}])) by (le))")
        }
        MetricKind::Summary => format!("{name}{{quantile=\"{QUANTILE}\"}}"),
    };

    Some(query)
}

/// The series whose absence means the metric is not being exported.
#[must_use]
pub fn presence_selector(metric: &Metric) -> Option<String> {
    let name = &metric.full_name;
    let selector = match metric.kind? {
        MetricKind::Counter | MetricKind::Errors | MetricKind::Gauge => name.clone(),
        MetricKind::Histogram | MetricKind::Timer => format!("{name}_bucket"),
        MetricKind::Summary => format!("{name}_count"),
    };

    Some(selector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(kind: Option<MetricKind>, label_clause: &str) -> Metric {
        Metric {
            normalized_name: "requests".to_string(),
            full_name: "svc_requests".to_string(),
            kind,
            labels: Vec::new(),
            label_clause: label_clause.to_string(),
            display_title: "Requests".to_string(),
            panel_column: 0,
            panel_id: 1,
        }
    }

    #[test]
    fn test_expression_per_kind() {
        let cases = [
            (MetricKind::Counter, "sum(rate(svc_requests[5m]))"),
            (MetricKind::Errors, "sum(rate(svc_requests[5m]))"),
            (MetricKind::Gauge, "svc_requests"),
            (MetricKind::Histogram, "histogram_quantile(0.95, sum(rate(svc_requests_bucket[5m])) by (le))"),
            (MetricKind::Timer, "histogram_quantile(0.95, sum(rate(svc_requests_bucket[5m])) by (le))"),
            (MetricKind::Summary, "svc_requests{quantile=\"0.95\"}"),
        ];

        for (kind, expected) in cases {
            assert_eq!(expression(&metric(Some(kind), "")).as_deref(), Some(expected), "{kind}");
        }
    }

    #[test]
    fn test_labeled_counter() {
        let m = metric(Some(MetricKind::Counter), "by (region,env)");
        assert_eq!(expression(&m).as_deref(), Some("sum(rate(svc_requests[5m])) by (region,env)"));
    }

    #[test]
    fn test_unknown_kind_has_no_query() {
        assert_eq!(expression(&metric(None, "")), None);
        assert_eq!(presence_selector(&metric(None, "")), None);
    }

    #[test]
    fn test_presence_selector() {
        assert_eq!(presence_selector(&metric(Some(MetricKind::Gauge), "")).as_deref(), Some("svc_requests"));
        assert_eq!(presence_selector(&metric(Some(MetricKind::Timer), "")).as_deref(), Some("svc_requests_bucket"));
        assert_eq!(presence_selector(&metric(Some(MetricKind::Summary), "")).as_deref(), Some("svc_requests_count"));
    }
}
