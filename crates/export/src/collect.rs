//! Layer collection
//!
//! Walks the indexed layer model once, from the top index down to 1, keeping
//! a stack of effective group visibility. Group end markers sit below their
//! children, so walking downwards meets the start marker first.

use crate::guard::SelectionGuard;
use crate::{CancelToken, ExportError, ExportResult, Progress, ProgressCallback};
use document::{HostError, HostResult, LayerHandle, LayerHost, LayerSection};

/// Leaf layers of a document, in collection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedLayers {
    all: Vec<LayerHandle>,
    visible: Vec<LayerHandle>,
}

impl CollectedLayers {
    /// Every exportable leaf
    pub fn all(&self) -> &[LayerHandle] {
        &self.all
    }

    /// Leaves whose own flag and every ancestor flag are set
    pub fn visible(&self) -> &[LayerHandle] {
        &self.visible
    }

    pub fn targets(&self, visible_only: bool) -> &[LayerHandle] {
        if visible_only {
            &self.visible
        } else {
            &self.all
        }
    }

    /// Only the flattened background, as in a single-layer document
    pub fn is_flattened_background(&self) -> bool {
        matches!(self.all.as_slice(), [only] if only.is_background)
    }
}

enum Walk {
    Done(CollectedLayers),
    Cancelled,
}

/// Collect the leaf layers of `host`.
///
/// The active selection is restored before returning, also when cancelled
/// or failing. A walk cancelled before its last index discards what it
/// gathered.
pub fn collect(
    host: &mut dyn LayerHost,
    cancel: &CancelToken,
    progress: Option<&ProgressCallback>,
) -> ExportResult<CollectedLayers> {
    let mut guard = SelectionGuard::new(host).map_err(ExportError::CollectionFailed)?;
    let outcome = walk(&mut *guard, cancel, progress);
    let restored = guard.restore();

    let outcome = outcome.map_err(ExportError::CollectionFailed)?;
    restored.map_err(ExportError::CollectionFailed)?;

    match outcome {
        Walk::Done(layers) => {
            log::info!(
                "Collected {} layers, {} visible",
                layers.all.len(),
                layers.visible.len()
            );
            Ok(layers)
        }
        Walk::Cancelled => {
            log::info!("Layer collection cancelled");
            Err(ExportError::Cancelled)
        }
    }
}

fn walk(
    host: &mut dyn LayerHost,
    cancel: &CancelToken,
    progress: Option<&ProgressCallback>,
) -> HostResult<Walk> {
    let mut layers = CollectedLayers::default();
    let count = host.layer_count()?;
    log::debug!("Document has {} indexed layers", count);

    if count == 0 {
        // Flattened image: the background is the only layer
        let background = host
            .background()?
            .ok_or_else(|| HostError::Unsupported("document has no layers".to_string()))?;
        layers.all.push(background.clone());
        layers.visible.push(background);
        return Ok(Walk::Done(layers));
    }

    let mut ancestors = vec![true];
    for (scanned, index) in (1..=count).rev().enumerate() {
        let descriptor = host.describe(index)?;
        let parent_visible = ancestors.last().copied().unwrap_or(true);
        match descriptor.section {
            LayerSection::GroupStart => ancestors.push(descriptor.visible && parent_visible),
            LayerSection::GroupEnd => {
                if ancestors.len() > 1 {
                    ancestors.pop();
                } else {
                    log::warn!("Unbalanced group end marker at index {}", index);
                }
            }
            LayerSection::Content => {
                host.select(index)?;
                let layer = host.active_layer()?;
                if descriptor.visible && parent_visible {
                    layers.visible.push(layer.clone());
                }
                layers.all.push(layer);
            }
        }

        if let Some(callback) = progress {
            callback(Progress::Collecting {
                scanned: scanned + 1,
                total: count,
            });
        }
        host.refresh();
        // A finished scan is kept even if cancel arrives with the last index
        if index > 1 && cancel.is_cancelled() {
            return Ok(Walk::Cancelled);
        }
    }

    if let Some(background) = host.background()? {
        if host.is_visible(background.id)? {
            layers.visible.push(background.clone());
        }
        layers.all.push(background);
    }

    Ok(Walk::Done(layers))
}
