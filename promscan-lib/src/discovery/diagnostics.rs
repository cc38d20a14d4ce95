use super::ScanError;
use core::fmt::{Display, Formatter};

/// Something a scan noticed without stopping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A call site was left out because one of its arguments had the wrong shape.
    Skipped(ScanError),

    /// A configuration call replaced the settings of an earlier one.
    ConfigurationReplaced { previous: String, location: String },
}

impl Diagnostic {
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Skipped(e) => write!(f, "{e} (call skipped)"),
            Self::ConfigurationReplaced { previous, location } => {
                write!(f, "configuration at {location} replaces the one at {previous}")
            }
        }
    }
}
