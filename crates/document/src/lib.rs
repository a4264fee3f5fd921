//! Layered document host for LayerExport
//!
//! Provides the host interface the exporter drives, and an in-memory
//! raster document implementing it.

pub mod action;
pub mod host;
pub mod manifest;
pub mod memory;
pub mod raster;
pub mod save;
mod writer;

pub use action::{ActionDescriptor, ActionValue};
pub use host::{LayerDescriptor, LayerHandle, LayerHost, LayerId, LayerSection, SnapshotId};
pub use manifest::Manifest;
pub use memory::{HostStats, MemoryDocument};
pub use raster::Raster;
pub use save::{
    ExtensionCase, JpegFormatOptions, JpegSaveOptions, MatteType, SaveOptions, TargaBitsPerPixel,
    TargaSaveOptions,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("Quantization error: {0}")]
    Quantize(#[from] imagequant::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Layer index {0} out of range")]
    IndexOutOfRange(usize),

    #[error("Layer index {0} is a group marker and cannot be selected")]
    NotSelectable(usize),

    #[error("No active layer")]
    NoActiveLayer,

    #[error("Unknown layer {0}")]
    UnknownLayer(LayerId),

    #[error("Unknown snapshot {0}")]
    UnknownSnapshot(SnapshotId),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Missing descriptor key '{0}'")]
    MissingKey(&'static str),

    #[error("Unsupported option: {0}")]
    Unsupported(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Rectangle in document pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() && self.right() > other.x &&
        self.y < other.bottom() && self.bottom() > other.y
    }
}
