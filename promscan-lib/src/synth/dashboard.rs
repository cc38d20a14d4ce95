use super::query;
use crate::Result;
use crate::discovery::{Metric, PANEL_WIDTH, PanelLayout};
use core::fmt::Write;
use serde_json::{Value, json};
use std::collections::HashSet;

const PANEL_HEIGHT: u32 = 8;
const SCHEMA_VERSION: u32 = 39;
const DATASOURCE_VARIABLE: &str = "${datasource}";

/// Dashboard-level settings.
#[derive(Debug, Clone, Default)]
pub struct DashboardSettings {
    pub uid: String,
    pub title: String,
    pub tags: Vec<String>,

    /// Already-final metric names with no call site, plotted after the discovered metrics.
    pub external_metric_names: Vec<String>,
}

/// Write a Grafana dashboard for `metrics` as pretty-printed JSON.
pub fn generate<W: Write>(metrics: &[Metric], settings: &DashboardSettings, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(&dashboard(metrics, settings))?)?;
    Ok(())
}

/// Build the dashboard document.
#[must_use]
pub fn dashboard(metrics: &[Metric], settings: &DashboardSettings) -> Value {
    let mut panels: Vec<Value> = metrics.iter().map(metric_panel).collect();

    let mut layout = PanelLayout::after(metrics);
    let mut seen: HashSet<&str> = metrics.iter().map(|m| m.full_name.as_str()).collect();
    for name in &settings.external_metric_names {
        if !seen.insert(name.as_str()) {
            continue;
        }

        let (id, column) = layout.next_slot();
        panels.push(panel(
            id,
            column,
            name,
            &format!("external {name}"),
            Some(name.clone()),
        ));
    }

    json!({
        "uid": settings.uid,
        "title": settings.title,
        "tags": settings.tags,
        "editable": true,
        "schemaVersion": SCHEMA_VERSION,
        "time": { "from": "now-6h", "to": "now" },
        "refresh": "1m",
        "templating": {
            "list": [{
                "name": "datasource",
                "label": "Data source",
                "type": "datasource",
                "query": "prometheus"
            }]
        },
        "panels": panels
    })
}

fn metric_panel(metric: &Metric) -> Value {
    let description = match metric.kind {
        Some(kind) => format!("{kind} {}", metric.full_name),
        None => metric.full_name.clone(),
    };

    panel(
        metric.panel_id,
        metric.panel_column,
        &metric.display_title,
        &description,
        query::expression(metric),
    )
}

fn panel(id: u32, column: u32, title: &str, description: &str, expr: Option<String>) -> Value {
    let datasource = json!({ "type": "prometheus", "uid": DATASOURCE_VARIABLE });
    let targets: Vec<Value> = expr
        .into_iter()
        .map(|expr| {
            json!({
                "refId": "A",
                "datasource": datasource,
                "expr": expr,
                "legendFormat": "__auto"
            })
        })
        .collect();

    json!({
        "id": id,
        "type": "timeseries",
        "title": title,
        "description": description,
        "datasource": datasource,
        "gridPos": {
            "x": column,
            "y": (id - 1) / 2 * PANEL_HEIGHT,
            "w": PANEL_WIDTH,
            "h": PANEL_HEIGHT
        },
        "targets": targets
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::MetricKind;

    fn metric(id: u32, name: &str, kind: Option<MetricKind>) -> Metric {
        Metric {
            normalized_name: name.to_string(),
            full_name: format!("orders_{name}"),
            kind,
            labels: Vec::new(),
            label_clause: String::new(),
            display_title: name.to_string(),
            panel_column: if id % 2 == 1 { 0 } else { 12 },
            panel_id: id,
        }
    }

    fn settings() -> DashboardSettings {
        DashboardSettings {
            uid: "orders".to_string(),
            title: "Orders".to_string(),
            tags: vec!["generated".to_string()],
            external_metric_names: Vec::new(),
        }
    }

    fn exprs(doc: &Value) -> Vec<String> {
        doc["panels"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|p| p["targets"].as_array().unwrap().iter().map(|t| t["expr"].as_str().unwrap().to_string()))
            .collect()
    }

    #[test]
    fn test_dashboard_shape() {
        let metrics = [
            metric(1, "created", Some(MetricKind::Counter)),
            metric(2, "queuedepth", Some(MetricKind::Gauge)),
            metric(3, "latency", Some(MetricKind::Timer)),
        ];
        let doc = dashboard(&metrics, &settings());

        assert_eq!(doc["uid"], "orders");
        assert_eq!(doc["title"], "Orders");
        assert_eq!(doc["tags"][0], "generated");

        let panels = doc["panels"].as_array().unwrap();
        assert_eq!(panels.len(), 3);
        assert_eq!(panels[1]["id"], 2);
        assert_eq!(panels[1]["title"], "queuedepth");
        assert_eq!(panels[1]["description"], "gauge orders_queuedepth");
        assert_eq!(panels[1]["gridPos"]["x"], 12);
        assert_eq!(panels[1]["gridPos"]["y"], 0);
        assert_eq!(panels[2]["gridPos"]["x"], 0);
        assert_eq!(panels[2]["gridPos"]["y"], 8);
        assert_eq!(panels[2]["gridPos"]["w"], 12);

        assert_eq!(
            exprs(&doc),
            [
                "sum(rate(orders_created[5m]))",
                "orders_queuedepth",
                "histogram_quantile(0.95, sum(rate(orders_latency_bucket[5m])) by (le))",
            ]
        );
    }

    #[test]
    fn test_unknown_kind_has_no_target() {
        let doc = dashboard(&[metric(1, "thing", None)], &settings());
        assert!(doc["panels"][0]["targets"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_external_names_continue_layout() {
        let metrics = [metric(1, "created", Some(MetricKind::Counter))];
        let mut settings = settings();
        settings.external_metric_names = vec![
            "go_goroutines".to_string(),
            "orders_created".to_string(),
            "process_open_fds".to_string(),
            "go_goroutines".to_string(),
        ];

        let doc = dashboard(&metrics, &settings);
        let panels = doc["panels"].as_array().unwrap();
        assert_eq!(panels.len(), 3);

        assert_eq!(panels[1]["id"], 2);
        assert_eq!(panels[1]["title"], "go_goroutines");
        assert_eq!(panels[1]["gridPos"]["x"], 12);
        assert_eq!(panels[2]["id"], 3);
        assert_eq!(panels[2]["title"], "process_open_fds");
        assert_eq!(panels[2]["gridPos"]["x"], 0);
        assert_eq!(panels[2]["targets"][0]["expr"], "process_open_fds");
    }

    #[test]
    fn test_generate_writes_json() {
        let mut out = String::new();
        generate(&[metric(1, "created", Some(MetricKind::Counter))], &settings(), &mut out).unwrap();

        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["panels"][0]["targets"][0]["expr"], "sum(rate(orders_created[5m]))");
    }
}
