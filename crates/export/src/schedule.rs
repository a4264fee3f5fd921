//! Layer-by-layer export
//!
//! Every collected layer is hidden, then each target is shown on its own,
//! written, and hidden again. The document is put back from a snapshot on
//! every exit path.

use crate::encode::{encoder_for, Encoder};
use crate::guard::SnapshotGuard;
use crate::resolve::resolve;
use crate::{
    CancelToken, CollectedLayers, ExportConfig, ExportResult, Progress, ProgressCallback,
};
use document::{LayerHandle, LayerHost};
use std::fs;
use std::path::PathBuf;

/// Result of one export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Layers written successfully
    pub succeeded: usize,
    pub any_failure: bool,
    /// Names of the layers that could not be written
    pub failed: Vec<String>,
    /// Files written, in export order
    pub written: Vec<PathBuf>,
}

impl ExportOutcome {
    /// Layers written or failed
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    fn record(&mut self, layer: &LayerHandle, result: ExportResult<PathBuf>) {
        match result {
            Ok(path) => {
                log::info!("Exported '{}' to {}", layer.name, path.display());
                self.succeeded += 1;
                self.written.push(path);
            }
            Err(e) => {
                log::warn!("Failed to export '{}': {}", layer.name, e);
                self.any_failure = true;
                self.failed.push(layer.name.clone());
            }
        }
    }
}

/// Export the target layers of `layers` as configured.
///
/// Per-layer failures are recorded in the outcome. Errors returned here come
/// from setup or from restoring the document. Cancellation stops the loop
/// after the current layer; the caller observes it through `cancel`.
pub fn export(
    host: &mut dyn LayerHost,
    layers: &CollectedLayers,
    config: &ExportConfig,
    cancel: &CancelToken,
    progress: Option<&ProgressCallback>,
) -> ExportResult<ExportOutcome> {
    let targets = layers.targets(config.visible_only());
    let encoder = encoder_for(config.format());
    let mut outcome = ExportOutcome::default();

    // Create output directory
    fs::create_dir_all(config.destination())?;

    log::info!(
        "Exporting {} of {} layers as {} to {}",
        targets.len(),
        layers.all().len(),
        config.format(),
        config.destination().display()
    );

    if layers.is_flattened_background() {
        // Nothing to isolate in a flattened image
        for layer in targets {
            let result = write_layer(host, encoder.as_ref(), layer, config);
            outcome.record(layer, result);
            report(progress, outcome.attempted(), targets.len());
        }
        return Ok(outcome);
    }

    let mut guard = SnapshotGuard::capture(host)?;

    // Hide everything, groups reveal siblings otherwise
    for layer in layers.all() {
        guard.set_visible(layer.id, false)?;
    }

    let total = targets.len();
    for (i, layer) in targets.iter().enumerate() {
        let result = isolate(&mut *guard, encoder.as_ref(), layer, config);
        outcome.record(layer, result);

        report(progress, i + 1, total);
        guard.refresh();
        if cancel.is_cancelled() {
            log::info!("Export cancelled after {} of {} layers", i + 1, total);
            break;
        }
    }

    guard.restore()?;
    Ok(outcome)
}

fn isolate(
    host: &mut dyn LayerHost,
    encoder: &dyn Encoder,
    layer: &LayerHandle,
    config: &ExportConfig,
) -> ExportResult<PathBuf> {
    host.set_visible(layer.id, true)?;
    let written = write_layer(host, encoder, layer, config);
    host.set_visible(layer.id, false)?;
    written
}

fn write_layer(
    host: &mut dyn LayerHost,
    encoder: &dyn Encoder,
    layer: &LayerHandle,
    config: &ExportConfig,
) -> ExportResult<PathBuf> {
    let path = resolve(config.destination(), config.prefix(), &layer.name, config.extension())?;
    encoder.encode(host, &path, config.parameters())?;
    Ok(path)
}

fn report(progress: Option<&ProgressCallback>, completed: usize, total: usize) {
    if let Some(callback) = progress {
        callback(Progress::Exporting { completed, total });
    }
}
