use super::Host;
use super::common::{Common, CommonArgs};
use super::state::{RunState, parse_extra_labels};
use crate::Result;
use crate::discovery::{Discovery, normalize_prefix};
use crate::synth::{
    AlertDialect, AlertScope, AlertSettings, DashboardSettings, MetricsLabelsSummary, generate_alerts, generate_dashboard,
    generate_summary,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

const LOG_TARGET: &str = "  generate";
const FALLBACK_NAME: &str = "promscan";

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Where to write the alert rules (default is `alert_rules.yaml`, or inside the chart dir)
    #[arg(long, value_name = "PATH", help_heading = "Artifacts")]
    pub rules_output_path: Option<Utf8PathBuf>,

    /// Alert rules layout, either `alertManager` or `operator`
    #[arg(long, value_name = "FORMAT", help_heading = "Artifacts")]
    pub rules_output_format: Option<String>,

    /// Which metrics get an alert rule
    #[arg(long, value_name = "SCOPE", default_value = "all", help_heading = "Artifacts")]
    pub alert_scope: AlertScope,

    /// Static label added to every alert rule (can be repeated)
    #[arg(long = "alert-extra-labels", value_name = "KEY=VALUE", help_heading = "Artifacts")]
    pub alert_extra_labels: Vec<String>,

    /// Where to write the Grafana dashboard (default is `grafana_dashboard.json`, or inside the chart dir)
    #[arg(long, value_name = "PATH", help_heading = "Artifacts")]
    pub dashboard_output_path: Option<Utf8PathBuf>,

    /// Dashboard uid (default is derived from the metric prefix)
    #[arg(long, value_name = "UID", help_heading = "Artifacts")]
    pub dashboard_uid: Option<String>,

    /// Dashboard title (default is derived from the metric prefix)
    #[arg(long, value_name = "TITLE", help_heading = "Artifacts")]
    pub dashboard_title: Option<String>,

    /// Where to write the alert and metric counts (not written by default)
    #[arg(long, value_name = "PATH", help_heading = "Artifacts")]
    pub metrics_labels_path: Option<Utf8PathBuf>,
}

/// Artifact settings resolved before anything is scanned.
#[derive(Debug)]
struct ArtifactPlan {
    rules_path: Utf8PathBuf,
    dashboard_path: Utf8PathBuf,
    summary_path: Option<Utf8PathBuf>,
    dialect: AlertDialect,
    scope: AlertScope,
    extra_labels: Vec<String>,
    dashboard_uid: Option<String>,
    dashboard_title: Option<String>,
    dashboard_tags: Vec<String>,
    external_metric_names: Vec<String>,
}

impl ArtifactPlan {
    fn resolve(args: &GenerateArgs, state: &RunState) -> Result<Self> {
        let format = args
            .rules_output_format
            .as_deref()
            .or_else(|| state.rules_output_format())
            .unwrap_or("alertManager");
        let dialect = AlertDialect::parse(format)?;

        let extra_labels = if args.alert_extra_labels.is_empty() {
            state.alert_extra_labels.clone()
        } else {
            args.alert_extra_labels.clone()
        };
        let _ = parse_extra_labels(&extra_labels)?;

        Ok(Self {
            rules_path: args.rules_output_path.clone().unwrap_or_else(|| state.default_rules_path()),
            dashboard_path: args.dashboard_output_path.clone().unwrap_or_else(|| state.default_dashboard_path()),
            summary_path: args
                .metrics_labels_path
                .clone()
                .or_else(|| state.metrics_labels_path().map(Utf8Path::to_path_buf)),
            dialect,
            scope: args.alert_scope,
            extra_labels,
            dashboard_uid: args.dashboard_uid.clone().or_else(|| state.dashboard_uid().map(ToString::to_string)),
            dashboard_title: args.dashboard_title.clone().or_else(|| state.dashboard_title().map(ToString::to_string)),
            dashboard_tags: state.dashboard_tags.clone(),
            external_metric_names: state.external_metric_names.clone(),
        })
    }

    /// Render every artifact in memory so that a rendering failure leaves no partial output.
    fn render(&self, discovery: &Discovery) -> Result<Vec<(&Utf8Path, String)>> {
        let prefix = normalize_prefix(&discovery.config.prefix);
        let name = if prefix.is_empty() { FALLBACK_NAME } else { prefix.as_str() };

        let dashboard_settings = DashboardSettings {
            uid: self.dashboard_uid.clone().unwrap_or_else(|| name.to_string()),
            title: self.dashboard_title.clone().unwrap_or_else(|| format!("{name} metrics")),
            tags: self.dashboard_tags.clone(),
            external_metric_names: self.external_metric_names.clone(),
        };

        let alert_settings = AlertSettings {
            dialect: self.dialect,
            scope: self.scope,
            group_name: name.to_string(),
            extra_labels: parse_extra_labels(&self.extra_labels)?,
        };

        let mut dashboard = String::new();
        generate_dashboard(&discovery.metrics, &dashboard_settings, &mut dashboard)?;

        let mut rules = String::new();
        let alerts_count = generate_alerts(&discovery.metrics, &alert_settings, &mut rules)?;

        let mut artifacts = vec![(self.dashboard_path.as_path(), dashboard), (self.rules_path.as_path(), rules)];

        if let Some(path) = &self.summary_path {
            let summary = MetricsLabelsSummary {
                alerts_count,
                unique_metrics_count: discovery.metrics.len(),
            };

            let mut text = String::new();
            generate_summary(&summary, &mut text)?;
            artifacts.push((path.as_path(), text));
        }

        Ok(artifacts)
    }
}

/// Scan the sources and write the dashboard, the alert rules and, when asked for, the counts summary.
pub fn generate<H: Host>(host: &mut H, args: &GenerateArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let plan = ArtifactPlan::resolve(args, &common.state)?;

    let discovery = common.discover()?;
    for diagnostic in &discovery.diagnostics {
        let _ = writeln!(host.error(), "warning: {diagnostic}");
    }

    let artifacts = plan.render(&discovery)?;
    for (path, text) in &artifacts {
        write_artifact(path, text)?;
        log::info!(target: LOG_TARGET, "Wrote {} byte(s) to '{path}'", text.len());
    }

    let _ = writeln!(host.output(), "Discovered {} metric(s)", discovery.metrics.len());
    for (path, _) in &artifacts {
        let _ = writeln!(host.output(), "Generated {path}");
    }

    Ok(())
}

fn write_artifact(path: &Utf8Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).into_app_err_with(|| format!("creating output directory '{parent}'"))?;
    }

    fs::write(path, text).into_app_err_with(|| format!("writing '{path}'"))?;
    Ok(())
}
