//! Tree pane / content pane synchronization.
//!
//! [`Synchronizer`] holds the view state of the tree pane (selection and
//! expanded nodes) and the [`SyncMode`] toggle, and emits [`PaneCommand`]s
//! over an unbounded channel.
//!
//! Re-entrancy is broken by origin. User selections in the tree produce
//! outbound `Display` commands; content pane notifications produce inbound
//! reveals. A reveal never produces a `Display` command, so the panes cannot
//! ping-pong.
//!
//! Every navigation takes a [`Generation`] ticket when it starts. A result
//! arriving with an outdated ticket is abandoned: the last navigation wins.

use std::collections::BTreeSet;

use navtree_source::PageRef;
use tokio::sync::mpsc::UnboundedSender;

use crate::tree::TreePath;

/// Default label of the action that disables synchronization.
pub const DEFAULT_SYNC_ON_MESSAGE: &str = "click to disable panel synchronisation";

/// Default label of the action that enables synchronization.
pub const DEFAULT_SYNC_OFF_MESSAGE: &str = "click to enable panel synchronisation";

/// Whether the panes follow each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Navigation in either pane is mirrored in the other.
    #[default]
    Linked,
    /// Content pane navigation is ignored by the tree.
    Unlinked,
}

impl SyncMode {
    /// Mode for a stored `enabled` flag.
    #[must_use]
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Linked } else { Self::Unlinked }
    }

    /// True for [`SyncMode::Linked`].
    #[must_use]
    pub fn is_linked(self) -> bool {
        self == Self::Linked
    }

    /// The other mode.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Linked => Self::Unlinked,
            Self::Unlinked => Self::Linked,
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linked => f.write_str("linked"),
            Self::Unlinked => f.write_str("unlinked"),
        }
    }
}

/// Labels of the sync toggle control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToggleLabels {
    /// Shown while linked (the action disables synchronization).
    pub on_message: String,
    /// Shown while unlinked (the action enables synchronization).
    pub off_message: String,
}

impl Default for ToggleLabels {
    fn default() -> Self {
        Self {
            on_message: DEFAULT_SYNC_ON_MESSAGE.to_owned(),
            off_message: DEFAULT_SYNC_OFF_MESSAGE.to_owned(),
        }
    }
}

/// Command sent to the panes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaneCommand {
    /// Content pane: display the page.
    Display(PageRef),
    /// Tree pane: expand the ancestors of the node, select it and scroll it into view.
    Reveal(TreePath),
    /// Tree pane: show the children of the node.
    Expand(TreePath),
}

/// Ticket identifying a navigation in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// What became of a navigation once its plan completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Node selected and revealed.
    Revealed(TreePath),
    /// Synchronization was disabled; nothing changed.
    Ignored,
    /// A newer navigation started meanwhile; nothing changed.
    Superseded,
}

/// View state and sync toggle of the tree pane.
#[derive(Debug)]
pub struct Synchronizer {
    mode: SyncMode,
    labels: ToggleLabels,
    selection: Option<TreePath>,
    expanded: BTreeSet<TreePath>,
    generation: u64,
    commands: UnboundedSender<PaneCommand>,
}

impl Synchronizer {
    /// Create a synchronizer in `mode` sending commands to `commands`.
    #[must_use]
    pub fn new(
        mode: SyncMode,
        labels: ToggleLabels,
        commands: UnboundedSender<PaneCommand>,
    ) -> Self {
        Self {
            mode,
            labels,
            selection: None,
            expanded: BTreeSet::new(),
            generation: 0,
            commands,
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Flip the mode.
    ///
    /// Keeps the selection and emits nothing.
    pub fn toggle(&mut self) -> SyncMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    /// Label of the toggle control in the current mode.
    #[must_use]
    pub fn toggle_label(&self) -> &str {
        match self.mode {
            SyncMode::Linked => &self.labels.on_message,
            SyncMode::Unlinked => &self.labels.off_message,
        }
    }

    /// Selected node.
    #[must_use]
    pub fn selection(&self) -> Option<&[usize]> {
        self.selection.as_deref()
    }

    /// Expanded nodes.
    #[must_use]
    pub fn expanded(&self) -> &BTreeSet<TreePath> {
        &self.expanded
    }

    /// True if the node at `path` is expanded.
    #[must_use]
    pub fn is_expanded(&self, path: &[usize]) -> bool {
        self.expanded.contains(path)
    }

    /// Start a navigation, superseding any navigation in flight.
    pub fn begin_navigation(&mut self) -> Generation {
        self.generation += 1;
        Generation(self.generation)
    }

    /// True if no navigation started after `generation`.
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.generation
    }

    /// User selected a tree node.
    ///
    /// Supersedes pending navigations and asks the content pane to display
    /// `link`, whatever the mode.
    pub fn on_tree_selected(&mut self, path: TreePath, link: Option<&PageRef>) {
        self.begin_navigation();
        self.selection = Some(path);
        if let Some(link) = link {
            self.send(PaneCommand::Display(link.clone()));
        }
    }

    /// Apply the result of a content pane notification.
    ///
    /// Reveals `path` unless the navigation was superseded or synchronization
    /// was disabled while its plan ran.
    pub fn complete_inbound(&mut self, generation: Generation, path: TreePath) -> InboundOutcome {
        if !self.is_current(generation) {
            return InboundOutcome::Superseded;
        }
        if !self.mode.is_linked() {
            return InboundOutcome::Ignored;
        }
        self.reveal(path.clone());
        InboundOutcome::Revealed(path)
    }

    /// Apply the result of a deep link.
    ///
    /// Reveals `path` in any mode; the content pane follows only when linked.
    pub fn complete_deep_link(
        &mut self,
        generation: Generation,
        anchor: &PageRef,
        path: TreePath,
    ) -> InboundOutcome {
        if !self.is_current(generation) {
            return InboundOutcome::Superseded;
        }
        self.reveal(path.clone());
        if self.mode.is_linked() {
            self.send(PaneCommand::Display(anchor.clone()));
        }
        InboundOutcome::Revealed(path)
    }

    /// Expand every ancestor of `path`, select it and ask the tree pane to scroll to it.
    pub fn reveal(&mut self, path: TreePath) {
        for end in 0..path.len() {
            self.expanded.insert(path[..end].to_vec());
        }
        self.selection = Some(path.clone());
        self.send(PaneCommand::Reveal(path));
    }

    /// Mark the node at `path` as expanded.
    pub fn expand(&mut self, path: TreePath) {
        self.expanded.insert(path.clone());
        self.send(PaneCommand::Expand(path));
    }

    /// Mark the node at `path` as collapsed; returns false if it was not expanded.
    pub fn collapse(&mut self, path: &[usize]) -> bool {
        self.expanded.remove(path)
    }

    fn send(&self, command: PaneCommand) {
        if let Err(err) = self.commands.send(command) {
            tracing::debug!(command = ?err.0, "Pane command dropped, receiver closed");
        }
    }
}
