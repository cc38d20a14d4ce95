use super::ScanError;
use crate::facts::{ArgExpr, CallSite};

const PREFIX_KEY: &str = "MetricNamePrefix";
const SEPARATOR_KEY: &str = "PrefixSeparator";
const CASE_SENSITIVE_KEY: &str = "CaseSensitiveMetricNames";

/// Naming policy applied to every metric of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// Prefix as written at the configuration call, before normalization.
    pub prefix: String,
    pub separator: String,
    pub case_sensitive: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            separator: "_".to_string(),
            case_sensitive: false,
        }
    }
}

/// Read the namespace settings from a configuration call.
///
/// The first argument must be a struct literal. `MetricNamePrefix` and `PrefixSeparator`
/// must be string literals; `CaseSensitiveMetricNames` takes effect by being present at
/// all. Other keys and unkeyed entries are ignored.
pub fn extract(site: &CallSite) -> Result<NamespaceConfig, ScanError> {
    let malformed = |detail: String| ScanError::MalformedLiteralArgument {
        location: site.location.clone(),
        detail,
    };

    let Some(arg) = site.args.first() else {
        return Err(malformed(format!("'{}' has no options argument", site.method)));
    };

    let Some(entries) = arg.as_composite() else {
        return Err(malformed(format!("'{}' options must be a struct literal, found a {}", site.method, arg.shape())));
    };

    let mut config = NamespaceConfig::default();
    for entry in entries {
        let Some(key) = entry.key.as_deref() else {
            continue;
        };

        match key {
            PREFIX_KEY => config.prefix = string_value(key, &entry.value).map_err(malformed)?,
            SEPARATOR_KEY => config.separator = string_value(key, &entry.value).map_err(malformed)?,
            CASE_SENSITIVE_KEY => config.case_sensitive = true,
            _ => {}
        }
    }

    Ok(config)
}

fn string_value(key: &str, value: &ArgExpr) -> Result<String, String> {
    value
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| format!("'{key}' must be a string literal, found a {}", value.shape()))
}
