//! Export module for LayerExport
//!
//! Collects the leaf layers of a host document, then exports each one to its
//! own image file by isolating its visibility, restoring the document after.

mod cancel;
pub mod collect;
pub mod config;
pub mod encode;
mod guard;
pub mod resolve;
pub mod schedule;

pub use cancel::CancelToken;
pub use collect::{collect, CollectedLayers};
pub use config::{
    parse_palette_size, ColorReduction, Dither, ExportConfig, ExportConfigBuilder, Format,
    FormatParameters, JpegEncoding, JpegMatte, JpegOptions, MatteColor, Png24Options, Png8Options,
    TargaDepth, TargaOptions,
};
pub use resolve::{resolve, resolve_with_limit, sanitize, NAME_SUFFIX_LIMIT};
pub use schedule::{export, ExportOutcome};

use document::HostError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Layer collection failed: {0}")]
    CollectionFailed(HostError),

    #[error("No free file name for '{base}'")]
    NameExhausted { base: String },

    #[error("Unsupported encoding option: {0}")]
    UnsupportedEncodingOption(String),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export cancelled")]
    Cancelled,
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Work completed so far, reported at every checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// `scanned` of `total` indexed layers examined
    Collecting { scanned: usize, total: usize },
    /// `completed` of `total` target layers exported or failed
    Exporting { completed: usize, total: usize },
}

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(Progress) + Send>;
