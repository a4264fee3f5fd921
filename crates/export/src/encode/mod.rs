//! Format encoders
//!
//! Two strategies write the isolated composite: a structured save-for-web
//! action for the PNG formats, and the host's generic save command for the
//! rest. [`encoder_for`] picks one from the format.

mod direct;
mod generic;

pub use direct::DirectEncoder;
pub use generic::GenericEncoder;

use crate::{ExportResult, Format, FormatParameters};
use document::LayerHost;
use std::path::Path;

/// Writes the host's current composite to a file
pub trait Encoder {
    fn encode(&self, host: &mut dyn LayerHost, path: &Path, parameters: &FormatParameters) -> ExportResult<()>;
}

/// Strategy for `format`
pub fn encoder_for(format: Format) -> Box<dyn Encoder> {
    if format.uses_direct_encoding() {
        Box::new(DirectEncoder)
    } else {
        Box::new(GenericEncoder)
    }
}
