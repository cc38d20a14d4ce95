/// Convert a Rust `snake_case` identifier into the `UpperCamelCase` spelling used by the instrumentation API.
pub fn to_upper_camel(ident: &str) -> String {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    let mut out = String::with_capacity(ident.len());

    for part in ident.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }

    out
}

/// Whether a path segment names a type rather than a module or function.
pub fn looks_like_type(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase) || segment == "Self"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_upper_camel() {
        assert_eq!(to_upper_camel("counter"), "Counter");
        assert_eq!(to_upper_camel("counter_with_labels"), "CounterWithLabels");
        assert_eq!(to_upper_camel("new_metrics"), "NewMetrics");
        assert_eq!(to_upper_camel("metric_name_prefix"), "MetricNamePrefix");
        assert_eq!(to_upper_camel("r#type"), "Type");
        assert_eq!(to_upper_camel("_leading"), "Leading");
        assert_eq!(to_upper_camel("Gauge"), "Gauge");
    }

    #[test]
    fn test_looks_like_type() {
        assert!(looks_like_type("PrometheusMetrics"));
        assert!(looks_like_type("Self"));
        assert!(!looks_like_type("promenade"));
        assert!(!looks_like_type(""));
    }
}
