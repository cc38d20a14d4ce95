use super::Host;
use super::state::{RunState, STATE_FILE_NAME};
use crate::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::bail;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output run-state file path (default is `.promscan_state` in the current directory)
    #[arg(value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn init_state<H: Host>(host: &mut H, args: &InitArgs) -> Result<()> {
    let output = args.output.clone().unwrap_or_else(|| Utf8PathBuf::from(STATE_FILE_NAME));
    if output.exists() && !args.force {
        bail!("'{output}' already exists, use --force to overwrite it");
    }

    RunState::save_default(&output)?;
    let _ = writeln!(host.output(), "Generated default run state file: {output}");
    Ok(())
}
