use super::{FactSource, InstrumentationApi, SourceUnit};
use crate::Result;
use camino::Utf8PathBuf;
use ohno::{EnrichableExt, IntoAppError};
use serde::{Deserialize, Serialize};
use std::fs;

const LOG_TARGET: &str = "     facts";

/// On-disk layout of a pre-resolved fact stream.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FactsDocument {
    #[serde(default)]
    units: Vec<SourceUnit>,
}

/// Call-site facts produced ahead of time by an external language frontend and stored as JSON.
#[derive(Debug, Clone)]
pub struct FactsFile {
    path: Utf8PathBuf,
    api: InstrumentationApi,
}

impl FactsFile {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, api: InstrumentationApi) -> Self {
        Self { path: path.into(), api }
    }

    /// Parse a fact stream from JSON text.
    pub fn parse(text: &str) -> Result<Vec<SourceUnit>> {
        let doc: FactsDocument = serde_json::from_str(text).into_app_err("parsing call-site facts")?;
        Ok(doc.units)
    }
}

impl FactSource for FactsFile {
    fn describe(&self) -> String {
        format!("fact stream '{}'", self.path)
    }

    fn load_units(&self) -> Result<Vec<SourceUnit>> {
        let text = fs::read_to_string(&self.path).into_app_err_with(|| format!("reading call-site facts from '{}'", self.path))?;
        let units = Self::parse(&text).map_err(|e| e.enrich_with(|| format!("loading '{}'", self.path)))?;

        log::debug!(target: LOG_TARGET, "Loaded {} unit(s) from '{}'", units.len(), self.path);
        Ok(units)
    }

    fn api(&self) -> &InstrumentationApi {
        &self.api
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{ArgExpr, ReceiverShape};

    const SAMPLE: &str = r#"{
        "units": [
            {
                "name": "github.com/acme/orders",
                "call_sites": [
                    {
                        "method": "NewMetrics",
                        "result_type": "*github.com/poblish/promenade/api.PrometheusMetrics",
                        "args": [
                            {
                                "kind": "composite",
                                "entries": [
                                    { "key": "MetricNamePrefix", "value": { "kind": "string", "value": "orders" } }
                                ]
                            }
                        ],
                        "location": "main.go:10"
                    },
                    {
                        "receiver_type": "*github.com/poblish/promenade/api.PrometheusMetrics",
                        "receiver_shape": "member",
                        "method": "Timer",
                        "args": [ { "kind": "string", "value": "Checkout" }, { "kind": "other" } ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let units = FactsFile::parse(SAMPLE).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "github.com/acme/orders");

        let sites = &units[0].call_sites;
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].method, "NewMetrics");
        assert_eq!(sites[0].location, "main.go:10");
        assert!(sites[0].args[0].as_composite().is_some());
        assert_eq!(sites[1].receiver_shape, ReceiverShape::Member);
        assert_eq!(sites[1].args[1], ArgExpr::Other);
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let _ = FactsFile::parse(r#"{"units": [], "extra": 1}"#).unwrap_err();
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(FactsFile::parse("{}").unwrap().is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_units_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("facts.json")).unwrap();
        fs::write(&path, SAMPLE).unwrap();

        let source = FactsFile::new(path.clone(), InstrumentationApi::default());
        let units = source.load_units().unwrap();
        assert_eq!(units.len(), 1);
        assert!(source.describe().contains("facts.json"));
        assert!(source.is_instrumentation_type("*github.com/poblish/promenade/api.PrometheusMetrics"));
    }

    #[test]
    fn test_load_units_missing_file() {
        let source = FactsFile::new("/definitely/not/here/facts.json", InstrumentationApi::default());
        let _ = source.load_units().unwrap_err();
    }
}
