use super::query;
use crate::Result;
use crate::discovery::Discovery;
use core::fmt::Write;
use owo_colors::OwoColorize;

/// Write a human-readable listing of a discovery run.
pub fn generate<W: Write>(discovery: &Discovery, use_colors: bool, writer: &mut W) -> Result<()> {
    let metrics = &discovery.metrics;
    let prefix = &discovery.config.prefix;

    let header = if prefix.is_empty() {
        format!("{} metric(s), no prefix", metrics.len())
    } else {
        format!("{} metric(s), prefix '{prefix}'", metrics.len())
    };
    if use_colors {
        writeln!(writer, "{}", header.bold())?;
    } else {
        writeln!(writer, "{header}")?;
    }

    let name_width = metrics.iter().map(|m| m.full_name.len()).max().unwrap_or(0);
    for metric in metrics {
        let kind = metric.kind.map_or_else(|| "?".to_string(), |k| k.to_string());
        let kind = format!("{kind:<9}");
        let kind = if use_colors { kind.cyan().to_string() } else { kind };

        writeln!(
            writer,
            "  {:>3} {:>2}  {kind} {:<name_width$}  {}",
            metric.panel_id,
            metric.panel_column,
            metric.full_name,
            metric.display_title,
        )?;

        if let Some(expr) = query::expression(metric) {
            if use_colors {
                writeln!(writer, "         {}", expr.dimmed())?;
            } else {
                writeln!(writer, "         {expr}")?;
            }
        }
    }

    if !discovery.diagnostics.is_empty() {
        writeln!(writer)?;
        for diagnostic in &discovery.diagnostics {
            let line = format!("warning: {diagnostic}");
            if use_colors {
                writeln!(writer, "{}", line.yellow())?;
            } else {
                writeln!(writer, "{line}")?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{Diagnostic, Metric, MetricKind, NamespaceConfig, ScanError};

    fn discovery() -> Discovery {
        Discovery {
            metrics: vec![
                Metric {
                    normalized_name: "created".to_string(),
                    full_name: "orders_created".to_string(),
                    kind: Some(MetricKind::Counter),
                    labels: Vec::new(),
                    label_clause: String::new(),
                    display_title: "Created".to_string(),
                    panel_column: 0,
                    panel_id: 1,
                },
                Metric {
                    normalized_name: "thing".to_string(),
                    full_name: "orders_thing".to_string(),
                    kind: None,
                    labels: Vec::new(),
                    label_clause: String::new(),
                    display_title: "Thing".to_string(),
                    panel_column: 12,
                    panel_id: 2,
                },
            ],
            config: NamespaceConfig {
                prefix: "orders".to_string(),
                ..NamespaceConfig::default()
            },
            diagnostics: vec![Diagnostic::Skipped(ScanError::MalformedLiteralArgument {
                location: "svc.go:9".to_string(),
                detail: "'Gauge': no metric name argument".to_string(),
            })],
        }
    }

    #[test]
    fn test_plain_listing() {
        let mut out = String::new();
        generate(&discovery(), false, &mut out).unwrap();

        assert!(out.starts_with("2 metric(s), prefix 'orders'\n"));
        assert!(out.contains("orders_created  Created"));
        assert!(out.contains("sum(rate(orders_created[5m]))"));
        assert!(out.contains("?"));
        assert!(out.contains("warning: svc.go:9: 'Gauge': no metric name argument (call skipped)"));
        assert!(!out.contains('\u{1b}'));
    }

    #[test]
    fn test_colored_listing() {
        let mut out = String::new();
        generate(&discovery(), true, &mut out).unwrap();
        assert!(out.contains('\u{1b}'));
    }
}
