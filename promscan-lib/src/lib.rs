#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for promscan
//!
//! This library consolidates all functionality for the promscan tool, which finds
//! every metric a codebase emits through a metrics instrumentation API and turns
//! that inventory into a Grafana dashboard and a set of Prometheus alerting rules.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`facts`]: Typed call-site facts and the adapters that produce them
//! - [`discovery`]: Call classification, namespace configuration, and metric assembly
//! - [`synth`]: Dashboard, alert rule, and console rendering

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod discovery;
#[cfg(not(any(debug_assertions, test)))]
mod discovery;

#[cfg(any(debug_assertions, test))]
pub mod facts;
#[cfg(not(any(debug_assertions, test)))]
mod facts;

#[cfg(any(debug_assertions, test))]
pub mod synth;
#[cfg(not(any(debug_assertions, test)))]
mod synth;

pub use crate::commands::{Host, run};
