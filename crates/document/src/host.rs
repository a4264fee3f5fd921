//! Host document interface
//!
//! The exporter never owns a document. It drives one through this trait:
//! indexed queries over a flat layer model, selection, visibility, state
//! snapshots and the two encoding commands.

use crate::{ActionDescriptor, HostResult, SaveOptions, ExtensionCase};
use rgb::RGB8;
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Stable identity of a layer inside its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a captured document state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotId(pub Uuid);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What an indexed slot of the layer model holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSection {
    /// A paintable leaf layer
    Content,
    /// The opening marker of a group (the group itself)
    GroupStart,
    /// The closing marker of a group
    GroupEnd,
}

/// Compact per-index answer of [`LayerHost::describe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub visible: bool,
    pub section: LayerSection,
}

/// Handle to a leaf layer, as returned by the host after selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerHandle {
    pub id: LayerId,
    pub name: String,
    /// The document's base layer
    pub is_background: bool,
}

/// Host-side document operations
///
/// Indices `1..=layer_count()` address content layers and group markers,
/// walking the tree from the bottom of the stack to the top. Index 0 is
/// reserved for the background layer, which `layer_count` never includes.
pub trait LayerHost {
    /// Bulk count of indexed layers, background excluded.
    fn layer_count(&mut self) -> HostResult<usize>;

    /// Visibility flag and section marker of the layer at `index`.
    fn describe(&mut self, index: usize) -> HostResult<LayerDescriptor>;

    /// The background layer, if the document has one.
    fn background(&mut self) -> HostResult<Option<LayerHandle>>;

    /// Index of the currently selected layer.
    fn active_index(&mut self) -> HostResult<Option<usize>>;

    /// Make the layer at `index` the active layer.
    fn select(&mut self, index: usize) -> HostResult<()>;

    fn clear_selection(&mut self) -> HostResult<()>;

    /// Full handle of the active layer.
    fn active_layer(&mut self) -> HostResult<LayerHandle>;

    fn is_visible(&mut self, layer: LayerId) -> HostResult<bool>;

    fn set_visible(&mut self, layer: LayerId, visible: bool) -> HostResult<()>;

    /// Capture every visibility flag and the selection.
    fn capture_snapshot(&mut self) -> HostResult<SnapshotId>;

    fn apply_snapshot(&mut self, snapshot: SnapshotId) -> HostResult<()>;

    fn discard_snapshot(&mut self, snapshot: SnapshotId) -> HostResult<()>;

    /// Run a non-interactive structured command.
    fn execute_action(&mut self, event: &str, descriptor: &ActionDescriptor) -> HostResult<()>;

    /// Save a copy of the current composite to `path`, overwriting.
    fn save_as(
        &mut self,
        path: &Path,
        options: &SaveOptions,
        as_copy: bool,
        extension: ExtensionCase,
    ) -> HostResult<()>;

    fn background_color(&mut self) -> HostResult<RGB8>;

    fn foreground_color(&mut self) -> HostResult<RGB8>;

    /// Checkpoint hook: lets an interactive host repaint progress UI.
    fn refresh(&mut self) {}
}
