//! `navtree check` command implementation.

use clap::Args;
use navtree_engine::Engine;
use navtree_source::PageRef;

use super::{GlobalArgs, format_path, open_engine};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Resolve every indexed anchor, not only the first and last index entries.
    #[arg(long)]
    all: bool,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Fails if the navigation index is empty or any anchor does not resolve.
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let engine = open_engine(global)?;

        let anchors = if self.all {
            let mut anchors: Vec<PageRef> = engine.anchor_index().anchors().cloned().collect();
            anchors.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            anchors
        } else {
            let (first, last) = engine.anchor_index().smoke_anchors().ok_or_else(|| {
                CliError::Validation("Navigation index is empty, nothing to check".to_owned())
            })?;
            let mut anchors = vec![first.clone()];
            if last != first {
                anchors.push(last.clone());
            }
            anchors
        };

        let failed = check_anchors(&engine, &anchors, &output).await;
        if failed > 0 {
            return Err(CliError::Validation(format!(
                "{failed} of {} anchors failed to resolve",
                anchors.len()
            )));
        }

        output.success(&format!(
            "All {} anchors resolved ({} fragments loaded)",
            anchors.len(),
            engine.loader().fetch_count()
        ));
        Ok(())
    }
}

/// Resolve each anchor, reporting as it goes. Returns the number of failures.
async fn check_anchors(engine: &Engine, anchors: &[PageRef], output: &Output) -> usize {
    let mut failed = 0;
    for anchor in anchors {
        match engine.plan(anchor).await {
            Ok(path) => output.result(&format!("ok    {anchor} {}", format_path(&path))),
            Err(err) => {
                failed += 1;
                output.error(&format!("FAIL  {anchor}: {err}"));
            }
        }
    }
    failed
}
