//! `navtree resolve` command implementation.

use clap::Args;
use navtree_source::PageRef;

use super::{GlobalArgs, format_path, open_engine};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the resolve command.
#[derive(Args)]
pub(crate) struct ResolveArgs {
    /// Page reference, e.g. `files.html` or `trackle_8h.html#a1d6ad19d`.
    anchor: String,

    /// Locate the page when the in-page anchor itself is not indexed.
    #[arg(long)]
    page: bool,
}

impl ResolveArgs {
    /// Execute the resolve command.
    ///
    /// Prints the index path of the node, then the labels leading to it.
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let engine = open_engine(global)?;
        let anchor = PageRef::new(self.anchor);

        let path = if self.page {
            engine.plan_page(&anchor).await?
        } else {
            engine.plan(&anchor).await?
        };

        output.highlight(&format_path(&path));
        output.result(&engine.labels(&path)?.join(" > "));

        let fetches = engine.loader().fetch_count();
        if fetches > 0 {
            output.info(&format!("Loaded {fetches} fragment(s)"));
        }

        Ok(())
    }
}
