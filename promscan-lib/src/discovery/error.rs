/// Conditions that stop or qualify a discovery run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// No namespace configuration call was observed in any scanned unit.
    #[error("no metrics configuration call found")]
    ConfigurationNotFound,

    /// Every candidate metric was rejected, or none were found.
    #[error("no metrics found")]
    NoMetricsDiscovered,

    /// The requested alert rule dialect is not one that can be rendered.
    #[error("unsupported alert rules format '{0}', expected 'alertManager' or 'operator'")]
    UnsupportedOutputDialect(String),

    /// More than one configuration call was found while multiple calls are disallowed.
    #[error("found {count} metrics configuration calls, at most one is allowed")]
    AmbiguousConfiguration { count: usize },

    /// An argument that must be a literal was something else. The call is skipped.
    #[error("{location}: {detail}")]
    MalformedLiteralArgument { location: String, detail: String },
}
