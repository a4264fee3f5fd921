//! Scoped document state guards
//!
//! Both guards borrow the host for their whole lifetime and hand it back
//! through `Deref`. Restoring happens exactly once: explicitly through
//! `restore`, which reports failure, or on drop as a best effort.

use document::{HostResult, LayerHost, SnapshotId};
use std::ops::{Deref, DerefMut};

/// Puts back the active-layer selection found at creation
pub(crate) struct SelectionGuard<'h> {
    host: &'h mut dyn LayerHost,
    original: Option<usize>,
    restored: bool,
}

impl<'h> SelectionGuard<'h> {
    pub fn new(host: &'h mut dyn LayerHost) -> HostResult<Self> {
        let original = host.active_index()?;
        Ok(Self {
            host,
            original,
            restored: false,
        })
    }

    pub fn restore(mut self) -> HostResult<()> {
        self.restored = true;
        restore_selection(&mut *self.host, self.original)
    }
}

fn restore_selection(host: &mut dyn LayerHost, original: Option<usize>) -> HostResult<()> {
    match original {
        Some(index) => host.select(index),
        None => host.clear_selection(),
    }
}

impl<'h> Deref for SelectionGuard<'h> {
    type Target = dyn LayerHost + 'h;

    fn deref(&self) -> &Self::Target {
        &*self.host
    }
}

impl<'h> DerefMut for SelectionGuard<'h> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.host
    }
}

impl Drop for SelectionGuard<'_> {
    fn drop(&mut self) {
        if !self.restored {
            self.restored = true;
            if let Err(e) = restore_selection(&mut *self.host, self.original) {
                log::error!("Failed to restore layer selection: {}", e);
            }
        }
    }
}

/// Applies and discards a document snapshot when the export is done
pub(crate) struct SnapshotGuard<'h> {
    host: &'h mut dyn LayerHost,
    snapshot: SnapshotId,
    restored: bool,
}

impl<'h> SnapshotGuard<'h> {
    pub fn capture(host: &'h mut dyn LayerHost) -> HostResult<Self> {
        let snapshot = host.capture_snapshot()?;
        log::debug!("Captured document snapshot {}", snapshot);
        Ok(Self {
            host,
            snapshot,
            restored: false,
        })
    }

    pub fn restore(mut self) -> HostResult<()> {
        self.restored = true;
        restore_snapshot(&mut *self.host, self.snapshot)
    }
}

/// Discard is attempted even when applying fails
fn restore_snapshot(host: &mut dyn LayerHost, snapshot: SnapshotId) -> HostResult<()> {
    let applied = host.apply_snapshot(snapshot);
    let discarded = host.discard_snapshot(snapshot);
    log::debug!("Restored document snapshot {}", snapshot);
    applied.and(discarded)
}

impl<'h> Deref for SnapshotGuard<'h> {
    type Target = dyn LayerHost + 'h;

    fn deref(&self) -> &Self::Target {
        &*self.host
    }
}

impl<'h> DerefMut for SnapshotGuard<'h> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.host
    }
}

impl Drop for SnapshotGuard<'_> {
    fn drop(&mut self) {
        if !self.restored {
            self.restored = true;
            if let Err(e) = restore_snapshot(&mut *self.host, self.snapshot) {
                log::error!("Failed to restore document snapshot: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use document::{MemoryDocument, Raster, Rect};
    use rgb::RGBA8;

    fn document() -> MemoryDocument {
        let mut doc = MemoryDocument::new(2, 2);
        let fill = Raster::solid(Rect::new(0, 0, 2, 2), RGBA8::new(1, 2, 3, 255));
        doc.add_layer(None, "a", fill.clone()).unwrap();
        doc.add_layer(None, "b", fill).unwrap();
        doc
    }

    #[test]
    fn selection_restored_on_drop() {
        let mut doc = document();
        let original = doc.active();
        {
            let mut guard = SelectionGuard::new(&mut doc).unwrap();
            guard.select(1).unwrap();
        }
        assert_eq!(doc.active(), original);
    }

    #[test]
    fn selection_restored_once() {
        let mut doc = document();
        let guard = SelectionGuard::new(&mut doc).unwrap();
        guard.restore().unwrap();
        assert_eq!(doc.stats().selections, 1);
    }

    #[test]
    fn snapshot_applied_and_discarded_on_drop() {
        let mut doc = document();
        let before = doc.visibility();
        {
            let mut guard = SnapshotGuard::capture(&mut doc).unwrap();
            let id = guard.active_layer().unwrap().id;
            guard.set_visible(id, false).unwrap();
        }
        assert_eq!(doc.visibility(), before);
        assert_eq!(doc.live_snapshots(), 0);
        assert_eq!(doc.stats().snapshots_applied, 1);
    }
}
