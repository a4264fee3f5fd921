//! Generic save encoding for JPEG and Targa

use super::Encoder;
use crate::{
    ExportError, ExportResult, FormatParameters, JpegEncoding, JpegMatte, JpegOptions, TargaDepth,
    TargaOptions,
};
use document::{
    ExtensionCase, JpegFormatOptions, JpegSaveOptions, LayerHost, MatteType, SaveOptions,
    TargaBitsPerPixel, TargaSaveOptions,
};
use std::path::Path;

/// Encoder using the host's save-a-copy command
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericEncoder;

impl Encoder for GenericEncoder {
    fn encode(&self, host: &mut dyn LayerHost, path: &Path, parameters: &FormatParameters) -> ExportResult<()> {
        let options = save_options(parameters)?;
        host.save_as(path, &options, true, ExtensionCase::Lowercase)?;
        Ok(())
    }
}

pub(crate) fn save_options(parameters: &FormatParameters) -> ExportResult<SaveOptions> {
    match parameters {
        FormatParameters::Jpeg(jpeg) => Ok(SaveOptions::Jpeg(jpeg_options(jpeg))),
        FormatParameters::Targa(targa) => Ok(SaveOptions::Targa(targa_options(targa))),
        other => Err(ExportError::UnsupportedEncodingOption(format!(
            "{} cannot be written through the generic save",
            other.format()
        ))),
    }
}

fn jpeg_options(options: &JpegOptions) -> JpegSaveOptions {
    JpegSaveOptions {
        quality: options.quality,
        matte: match options.matte {
            JpegMatte::White => MatteType::White,
            JpegMatte::Black => MatteType::Black,
            JpegMatte::Gray => MatteType::SemiGray,
            JpegMatte::None => MatteType::None,
            JpegMatte::Background => MatteType::Background,
            JpegMatte::Foreground => MatteType::Foreground,
        },
        embed_color_profile: options.embed_color_profile,
        format_options: match options.encoding {
            JpegEncoding::StandardBaseline => JpegFormatOptions::StandardBaseline,
            JpegEncoding::OptimizedBaseline => JpegFormatOptions::OptimizedBaseline,
            JpegEncoding::Progressive => JpegFormatOptions::Progressive,
        },
        scans: options.encoding.scans(),
    }
}

fn targa_options(options: &TargaOptions) -> TargaSaveOptions {
    TargaSaveOptions {
        resolution: match options.depth {
            TargaDepth::Sixteen => TargaBitsPerPixel::Sixteen,
            TargaDepth::TwentyFour => TargaBitsPerPixel::TwentyFour,
            TargaDepth::ThirtyTwo => TargaBitsPerPixel::ThirtyTwo,
        },
        alpha_channels: options.alpha_channel,
        rle_compression: options.rle_compression,
    }
}
