//! `navtree tree` command implementation.

use std::collections::HashSet;

use clap::Args;
use navtree_engine::{Engine, TreePath};
use navtree_source::{NodeChildren, TreeNode};

use super::{GlobalArgs, open_engine};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the tree command.
#[derive(Args)]
pub(crate) struct TreeArgs {
    /// Deepest level to print (the root is level 0).
    #[arg(short, long)]
    depth: Option<usize>,

    /// Load deferred subtrees down to the printed depth.
    #[arg(short, long)]
    expand: bool,
}

impl TreeArgs {
    /// Execute the tree command.
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let engine = open_engine(global)?;

        if self.expand {
            expand_deferred(&engine, self.depth, &output).await;
        }

        for line in render(engine.tree().root(), self.depth) {
            match line {
                Line::Node(text) => output.result(&text),
                Line::Deferred(text) => output.result_dim(&text),
            }
        }
        Ok(())
    }
}

/// Load deferred nodes level by level until none is left above `depth`.
///
/// Fragments that fail to load are reported and left deferred.
async fn expand_deferred(engine: &Engine, depth: Option<usize>, output: &Output) {
    let mut failed: HashSet<TreePath> = HashSet::new();
    loop {
        let pending: Vec<TreePath> = deferred_paths(engine.tree().root(), depth)
            .into_iter()
            .filter(|path| !failed.contains(path))
            .collect();
        if pending.is_empty() {
            return;
        }

        for path in pending {
            if let Err(err) = engine.expand(&path).await {
                output.warning(&format!("Skipping subtree: {err}"));
                failed.insert(path);
            }
        }
    }
}

/// Paths of deferred nodes whose children would be printed within `depth`.
fn deferred_paths(root: &TreeNode, depth: Option<usize>) -> Vec<TreePath> {
    fn walk(node: &TreeNode, path: &mut TreePath, depth: Option<usize>, out: &mut Vec<TreePath>) {
        if depth.is_some_and(|d| path.len() >= d) {
            return;
        }
        match node.children() {
            NodeChildren::Deferred(_) => out.push(path.clone()),
            NodeChildren::Inline(children) => {
                for (idx, child) in children.iter().enumerate() {
                    path.push(idx);
                    walk(child, path, depth, out);
                    path.pop();
                }
            }
            NodeChildren::None => {}
        }
    }

    let mut out = Vec::new();
    walk(root, &mut Vec::new(), depth, &mut out);
    out
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Node(String),
    Deferred(String),
}

/// Indented outline of the tree, two spaces per level.
fn render(root: &TreeNode, depth: Option<usize>) -> Vec<Line> {
    fn walk(node: &TreeNode, level: usize, depth: Option<usize>, out: &mut Vec<Line>) {
        let indent = "  ".repeat(level);
        let text = match node.link() {
            Some(link) => format!("{indent}{} ({link})", node.label()),
            None => format!("{indent}{}", node.label()),
        };

        match node.children() {
            NodeChildren::Deferred(handle) => {
                out.push(Line::Deferred(format!("{text} [+{handle}]")));
            }
            NodeChildren::Inline(children) => {
                out.push(Line::Node(text));
                if depth.is_none_or(|d| level < d) {
                    for child in children {
                        walk(child, level + 1, depth, out);
                    }
                }
            }
            NodeChildren::None => out.push(Line::Node(text)),
        }
    }

    let mut out = Vec::new();
    walk(root, 0, depth, &mut out);
    out
}
