//! Command dispatch logic for promscan

use super::{DiscoverArgs, GenerateArgs, InitArgs, discover_metrics, generate, init_state};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "promscan", author, version, long_about = None)]
#[command(about = "Derive Grafana dashboards and Prometheus alert rules from instrumented source code")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: PromscanSubcommand,
}

#[derive(Subcommand, Debug)]
enum PromscanSubcommand {
    /// Scan the sources and write the dashboard and alert rules
    Generate(Box<GenerateArgs>),
    /// Scan the sources and list the discovered metrics
    Discover(Box<DiscoverArgs>),
    /// Generate a default run-state file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        PromscanSubcommand::Generate(generate_args) => generate(host, generate_args),
        PromscanSubcommand::Discover(discover_args) => discover_metrics(host, discover_args),
        PromscanSubcommand::Init(init_args) => init_state(host, init_args),
    }
}
