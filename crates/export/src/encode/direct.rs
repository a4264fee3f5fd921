//! Save-for-web action encoding for PNG-24 and PNG-8
//!
//! The generic save path drops some PNG options, so these two formats are
//! written by building the export action field by field.

use super::Encoder;
use crate::{
    ColorReduction, Dither, ExportError, ExportResult, FormatParameters, MatteColor, Png24Options,
    Png8Options,
};
use document::{ActionDescriptor, LayerHost};
use rgb::RGB8;
use std::path::Path;

const EXPORT_EVENT: &str = "Expr";
const FULL_AMOUNT: i32 = 100;

/// Encoder driving the host's non-interactive export action
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectEncoder;

impl Encoder for DirectEncoder {
    fn encode(&self, host: &mut dyn LayerHost, path: &Path, parameters: &FormatParameters) -> ExportResult<()> {
        let options = match parameters {
            FormatParameters::Png24(png24) => png24_descriptor(host, path, png24)?,
            FormatParameters::Png8(png8) => png8_descriptor(host, path, png8)?,
            other => {
                return Err(ExportError::UnsupportedEncodingOption(format!(
                    "{} has no direct encoding",
                    other.format()
                )))
            }
        };

        let mut export = ActionDescriptor::new();
        export.put_object("Usng", "SaveForWeb", options);
        host.execute_action(EXPORT_EVENT, &export)?;
        Ok(())
    }
}

/// Colour of a PNG matte palette entry
pub(crate) fn matte_rgb(host: &mut dyn LayerHost, matte: MatteColor) -> ExportResult<RGB8> {
    Ok(match matte {
        MatteColor::White => RGB8::new(255, 255, 255),
        MatteColor::Black | MatteColor::CustomBlack => RGB8::new(0, 0, 0),
        MatteColor::Gray => RGB8::new(127, 127, 127),
        MatteColor::Background => host.background_color()?,
        MatteColor::Foreground => host.foreground_color()?,
    })
}

pub(crate) fn png24_descriptor(
    host: &mut dyn LayerHost,
    path: &Path,
    options: &Png24Options,
) -> ExportResult<ActionDescriptor> {
    let matte = matte_rgb(host, options.matte)?;

    let mut d = ActionDescriptor::new();
    d.put_enumerated("Op  ", "SWOp", "OpSa");
    d.put_enumerated("Fmt ", "IRFm", "PN24");
    d.put_bool("Intr", options.interlaced);
    d.put_bool("Trns", options.transparency);
    put_matte(&mut d, matte);
    put_trailer(&mut d, path);
    Ok(d)
}

pub(crate) fn png8_descriptor(
    host: &mut dyn LayerHost,
    path: &Path,
    options: &Png8Options,
) -> ExportResult<ActionDescriptor> {
    let matte = matte_rgb(host, options.matte)?;
    let (reduction, palette) = reduction_ids(options.color_reduction)?;

    // Amounts only reach the action for diffusion dithering
    let dither_amount = match options.dither {
        Dither::Diffusion => i32::from(options.dither_amount),
        _ => FULL_AMOUNT,
    };
    let (transparency_dither, transparency_amount) = if options.transparency {
        let amount = match options.transparency_dither {
            Dither::Diffusion => i32::from(options.transparency_dither_amount),
            _ => FULL_AMOUNT,
        };
        (options.transparency_dither, amount)
    } else {
        (Dither::None, FULL_AMOUNT)
    };

    let mut d = ActionDescriptor::new();
    d.put_enumerated("Op  ", "SWOp", "OpSa");
    d.put_enumerated("Fmt ", "IRFm", "PNG8");
    d.put_bool("Intr", options.interlaced);
    d.put_enumerated("RedA", "IRRd", reduction);
    if let Some(palette) = palette {
        d.put_string("FBPl", palette);
    }
    d.put_bool("RChT", false);
    d.put_bool("RChV", false);
    d.put_bool("AuRd", false);
    d.put_integer("NCol", i32::from(options.colors));
    d.put_enumerated("Dthr", "IRDt", dither_id(options.dither));
    d.put_integer("DthA", dither_amount);
    d.put_integer("DChS", 0);
    d.put_integer("DCUI", 0);
    d.put_bool("DChT", false);
    d.put_bool("DChV", false);
    d.put_integer("WebS", 0);
    d.put_enumerated("TDth", "IRDt", dither_id(transparency_dither));
    d.put_integer("TDtA", transparency_amount);
    d.put_bool("Trns", options.transparency);
    put_matte(&mut d, matte);
    put_trailer(&mut d, path);
    Ok(d)
}

/// Reduction identifier, plus the palette name for the fixed palettes
fn reduction_ids(reduction: ColorReduction) -> ExportResult<(&'static str, Option<&'static str>)> {
    Ok(match reduction {
        ColorReduction::Perceptual => ("Prcp", None),
        ColorReduction::Selective => ("Sltv", None),
        ColorReduction::Adaptive => ("Adpt", None),
        ColorReduction::Restrictive => ("Web ", None),
        ColorReduction::BlackWhite => ("FlBs", Some("Black & White")),
        ColorReduction::Grayscale => ("FlBs", Some("Grayscale")),
        ColorReduction::MacOs => ("FlBs", Some("Mac OS")),
        ColorReduction::Windows => ("FlBs", Some("Windows")),
        ColorReduction::Custom => {
            return Err(ExportError::UnsupportedEncodingOption(
                "custom colour reduction".to_string(),
            ))
        }
    })
}

fn dither_id(dither: Dither) -> &'static str {
    match dither {
        Dither::None => "None",
        Dither::Diffusion => "Dfsn",
        Dither::Pattern => "Ptrn",
        Dither::Noise => "BNoi",
    }
}

fn put_matte(d: &mut ActionDescriptor, matte: RGB8) {
    d.put_bool("Mtt ", true);
    d.put_integer("MttR", i32::from(matte.r));
    d.put_integer("MttG", i32::from(matte.g));
    d.put_integer("MttB", i32::from(matte.b));
}

fn put_trailer(d: &mut ActionDescriptor, path: &Path) {
    d.put_bool("SHTM", false);
    d.put_bool("SImg", true);
    d.put_bool("SSSO", false);
    d.put_list("SSLt", Vec::new());
    d.put_bool("DIDr", false);
    d.put_path("In  ", path);
}
