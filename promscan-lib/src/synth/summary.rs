use crate::Result;
use core::fmt::Write;
use serde::{Deserialize, Serialize};

/// Counts recorded next to the generated artifacts, for tooling that tracks alert coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsLabelsSummary {
    pub alerts_count: usize,
    pub unique_metrics_count: usize,
}

pub fn generate<W: Write>(summary: &MetricsLabelsSummary, writer: &mut W) -> Result<()> {
    write!(writer, "{}", serde_yaml::to_string(summary)?)?;
    Ok(())
}
