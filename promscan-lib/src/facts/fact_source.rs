use super::{InstrumentationApi, SourceUnit};
use crate::Result;

/// A provider of typed call-site facts.
///
/// Implementations do all parsing and type resolution. The discovery engine only
/// consumes the resulting units and asks the provider whether a type string denotes
/// the instrumentation API.
pub trait FactSource {
    /// Human-readable description of where the facts come from.
    fn describe(&self) -> String;

    /// Load every source unit, in the order they should be scanned.
    fn load_units(&self) -> Result<Vec<SourceUnit>>;

    /// Names of the instrumentation API this provider resolves calls against.
    fn api(&self) -> &InstrumentationApi;

    /// Whether `type_name`, as reported in this provider's call sites, is the instrumentation type.
    fn is_instrumentation_type(&self, type_name: &str) -> bool {
        self.api().matches_type(type_name)
    }
}
