use crate::facts::{CallSite, FactSource, ReceiverShape};

/// What a call site means to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Emits a metric through the instrumentation object.
    Emission,

    /// Builds the instrumentation object and sets the metric namespace.
    Configuration,

    Ignored,
}

/// Classify one call site.
///
/// Only two receiver shapes are recognized, a direct value and a member access. Any other
/// way of reaching the instrumentation object is ignored.
pub fn classify(site: &CallSite, source: &dyn FactSource) -> CallClass {
    let api = source.api();
    let receiver_matches = site
        .receiver_type
        .as_deref()
        .is_some_and(|ty| source.is_instrumentation_type(ty));

    match site.receiver_shape {
        ReceiverShape::Direct => {
            if receiver_matches && !api.is_noop_helper(&site.method) {
                CallClass::Emission
            } else if api.is_constructor(&site.method)
                && site
                    .result_type
                    .as_deref()
                    .is_some_and(|ty| source.is_instrumentation_type(ty))
            {
                CallClass::Configuration
            } else {
                CallClass::Ignored
            }
        }
        ReceiverShape::Member => {
            if receiver_matches && !api.is_noop_helper(&site.method) {
                CallClass::Emission
            } else {
                CallClass::Ignored
            }
        }
    }
}
