//! Settings and scanning shared between the generate and discover commands.

use super::state::RunState;
use crate::Result;
use crate::discovery::{self, Discovery, DiscoveryOptions};
use crate::facts::{FactSource, FactsFile, RustSource};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use std::io::{IsTerminal, stdout};

const LOG_TARGET: &str = "    common";

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Common arguments shared between the generate and discover commands
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Directory to scan, also where `.promscan_state` is read from (default is the current directory)
    #[arg(long, value_name = "PATH")]
    pub source_path: Option<Utf8PathBuf>,

    /// Cargo package to scan instead of the whole source path (can be repeated)
    #[arg(long = "pkg", value_name = "NAME")]
    pub packages: Vec<String>,

    /// Path to the Cargo.toml used to find packages (default is `Cargo.toml` in the source path)
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<Utf8PathBuf>,

    /// Read call-site facts from a JSON document instead of scanning Rust sources
    #[arg(long, value_name = "PATH", conflicts_with = "packages")]
    pub facts: Option<Utf8PathBuf>,

    /// Metric prefix used when the configuration call does not supply one
    #[arg(long, value_name = "PREFIX")]
    pub default_metrics_prefix: Option<String>,

    /// Fail when more than one metrics configuration call is found, instead of keeping the last
    #[arg(long)]
    pub strict_config: bool,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

/// Resolved scan settings: command-line flags first, then the run state, then defaults.
#[derive(Debug)]
pub struct Common {
    pub state: RunState,
    pub source_path: Utf8PathBuf,
    packages: Vec<String>,
    manifest_path: Option<Utf8PathBuf>,
    facts: Option<Utf8PathBuf>,
    options: DiscoveryOptions,
    color: ColorMode,
}

impl Common {
    pub fn new(args: &CommonArgs) -> Result<Self> {
        Self::init_logging(args.log_level);

        let state_dir = args.source_path.clone().unwrap_or_else(|| Utf8PathBuf::from("."));
        let state = RunState::load(&state_dir)?;

        let source_path = args
            .source_path
            .clone()
            .or_else(|| state.source_path().map(Utf8Path::to_path_buf))
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        let packages = if args.packages.is_empty() {
            state.default_package().map(|p| vec![p.to_string()]).unwrap_or_default()
        } else {
            args.packages.clone()
        };

        let default_prefix = args
            .default_metrics_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .or_else(|| state.default_metrics_prefix())
            .map(ToString::to_string);

        Ok(Self {
            packages,
            manifest_path: args.manifest_path.clone(),
            facts: args.facts.clone(),
            options: DiscoveryOptions {
                default_prefix,
                strict_config: args.strict_config,
            },
            color: args.color,
            source_path,
            state,
        })
    }

    fn init_logging(log_level: LogLevel) {
        let level = match log_level {
            LogLevel::None => return,
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        let env = env_logger::Env::default().filter_or("RUST_LOG", level);

        // a second run in the same process keeps the first logger
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
            .try_init();
    }

    pub fn use_colors(&self) -> bool {
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }

    /// Build the provider selected by the settings.
    pub fn fact_source(&self) -> Result<Box<dyn FactSource>> {
        let api = self.state.instrumentation.clone();

        if let Some(path) = &self.facts {
            return Ok(Box::new(FactsFile::new(path.clone(), api)));
        }

        if self.packages.is_empty() {
            return Ok(Box::new(RustSource::new(api).with_root(self.source_path.as_str(), self.source_path.clone())));
        }

        let manifest_path = self
            .manifest_path
            .clone()
            .unwrap_or_else(|| self.source_path.join("Cargo.toml"));
        Ok(Box::new(RustSource::new(api).with_packages(&manifest_path, &self.packages)?))
    }

    /// Load every unit from the selected provider and run discovery over it.
    pub fn discover(&self) -> Result<Discovery> {
        let source = self.fact_source()?;
        log::info!(target: LOG_TARGET, "Scanning {}", source.describe());

        let units = source.load_units()?;
        let discovery = discovery::discover(source.as_ref(), &units, &self.options)?;
        Ok(discovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::state::STATE_FILE_NAME;
    use clap::Parser;
    use std::fs;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    fn parse(args: &[&str]) -> CommonArgs {
        TestCli::parse_from(std::iter::once("promscan").chain(args.iter().copied())).common
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri does not support file I/O")]
    fn test_flags_override_state() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(
            dir_path.join(STATE_FILE_NAME),
            "default_package: orders\ndefault_metrics_prefix: state_prefix\n",
        )
        .unwrap();

        let common = Common::new(&parse(&["--source-path", dir_path.as_str(), "--pkg", "billing", "--default-metrics-prefix", "flag"])).unwrap();
        assert_eq!(common.source_path, dir_path);
        assert_eq!(common.packages, ["billing"]);
        assert_eq!(common.options.default_prefix.as_deref(), Some("flag"));

        let common = Common::new(&parse(&["--source-path", dir_path.as_str()])).unwrap();
        assert_eq!(common.packages, ["orders"]);
        assert_eq!(common.options.default_prefix.as_deref(), Some("state_prefix"));
        assert!(!common.options.strict_config);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri does not support file I/O")]
    fn test_state_source_path() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(dir_path.join(STATE_FILE_NAME), "source_path: elsewhere\n").unwrap();

        let common = Common::new(&parse(&["--source-path", dir_path.as_str()])).unwrap();
        assert_eq!(common.source_path, dir_path);
    }

    #[test]
    fn test_color_modes() {
        let mut args = parse(&["--source-path", "no/such/dir", "--color", "always"]);
        assert!(Common::new(&args).unwrap().use_colors());

        args.color = ColorMode::Never;
        assert!(!Common::new(&args).unwrap().use_colors());
    }

    #[test]
    fn test_facts_conflicts_with_packages() {
        let result = TestCli::try_parse_from(["promscan", "--facts", "facts.json", "--pkg", "orders"]);
        let _ = result.unwrap_err();
    }

    #[test]
    fn test_facts_selects_fact_stream() {
        let common = Common::new(&parse(&["--source-path", "no/such/dir", "--facts", "facts.json"])).unwrap();
        let source = common.fact_source().unwrap();
        assert_eq!(source.describe(), "fact stream 'facts.json'");
    }
}
