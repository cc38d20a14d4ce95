//! Command-line interface and orchestration for promscan
//!
//! This module implements the CLI commands and drives the fact providers, the
//! discovery engine and the synthesizers end to end. It handles argument parsing,
//! run-state merging, and writing the generated artifacts.
//!
//! ## Commands
//!
//! - **generate**: Scan the sources, discover metrics, and write the Grafana
//!   dashboard, the alert rules and, optionally, the metrics-labels summary
//! - **discover**: Scan and discover as `generate` does, but only print the
//!   metric list and any diagnostics
//! - **init**: Write a commented default `.promscan_state` file
//!
//! ## Settings
//!
//! Every setting is resolved in the same order: a command-line flag wins, then
//! the value in `.promscan_state` (read from the source path), then the built-in
//! default. Artifact settings, including the alert rules dialect, are resolved
//! and validated before any source is scanned, so a bad setting fails fast and
//! nothing is written. Rendering also completes in memory before the first file
//! is written.

mod common;
mod discover;
mod generate;
mod host;
mod init;
mod run;
mod state;

pub use discover::{DiscoverArgs, discover_metrics};
pub use generate::{GenerateArgs, generate};
pub use host::Host;
pub use init::{InitArgs, init_state};
pub use run::run;
