use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use crate::synth::generate_console;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Exit with status code 1 if any call was skipped or the configuration was replaced
    #[arg(long)]
    pub deny_warnings: bool,
}

/// Scan the sources and list the discovered metrics without writing any file.
pub fn discover_metrics<H: Host>(host: &mut H, args: &DiscoverArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let discovery = common.discover()?;

    let mut listing = String::new();
    generate_console(&discovery, common.use_colors(), &mut listing)?;
    let _ = write!(host.output(), "{listing}");

    if args.deny_warnings && !discovery.diagnostics.is_empty() {
        host.exit(1);
    }

    Ok(())
}
