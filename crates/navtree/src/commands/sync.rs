//! `navtree sync` command implementation.

use clap::Args;

use super::{GlobalArgs, open_engine};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sync command.
#[derive(Args)]
pub(crate) struct SyncArgs {
    /// Flip the synchronisation state (remembered when `sync.persist` is set).
    #[arg(short, long)]
    toggle: bool,
}

impl SyncArgs {
    /// Execute the sync command.
    pub(crate) fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let engine = open_engine(global)?;

        let mode = if self.toggle {
            engine.toggle_sync()
        } else {
            engine.sync_state()
        };

        output.highlight(&format!("Panel synchronisation: {mode}"));
        output.result(&engine.toggle_label());
        Ok(())
    }
}
