//! Typed call-site facts.
//!
//! The discovery engine never parses source code itself. A [`FactSource`] hands it a list of
//! [`SourceUnit`]s, each holding the call expressions of one package in source order, with the
//! static types of receivers and results already resolved.
//!
//! Two sources are provided:
//!
//! - [`RustSource`] parses Rust code with `ra_ap_syntax`.
//! - [`FactsFile`] reads facts produced by an external frontend from a JSON document, which is how
//!   codebases in other languages are scanned.

mod call_site;
mod fact_source;
mod facts_file;
pub(crate) mod instrumentation_api;
mod rust_source;

pub use call_site::{ArgExpr, CallSite, CompositeEntry, ReceiverShape, SourceUnit};
pub use fact_source::FactSource;
pub use facts_file::FactsFile;
pub use instrumentation_api::InstrumentationApi;
pub use rust_source::{RustSource, SourceRoot};
