//! Export configuration
//!
//! An [`ExportConfig`] can only be obtained through
//! [`ExportConfigBuilder::finalize`], which checks that the parameters match
//! the chosen format and are within range. Defaults mirror the options a user
//! sees first when picking a format.

use crate::{ExportError, ExportResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

/// Output file kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Deserialize)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    #[strum(to_string = "PNG-24", serialize = "png24")]
    #[serde(alias = "png-24")]
    Png24,
    #[strum(to_string = "PNG-8", serialize = "png8")]
    #[serde(alias = "png-8")]
    Png8,
    #[strum(to_string = "JPG", serialize = "jpeg")]
    #[serde(alias = "jpg")]
    Jpeg,
    #[strum(to_string = "TGA", serialize = "targa")]
    #[serde(alias = "tga")]
    Targa,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Png24, Format::Png8, Format::Jpeg, Format::Targa];

    /// File extension, with the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            Format::Png24 | Format::Png8 => ".png",
            Format::Jpeg => ".jpg",
            Format::Targa => ".tga",
        }
    }

    /// Formats whose options the generic save command is known to ignore
    /// in part, and which are therefore encoded through a structured action.
    pub fn uses_direct_encoding(self) -> bool {
        matches!(self, Format::Png24 | Format::Png8)
    }
}

/// Matte palette of the PNG formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum MatteColor {
    #[default]
    White,
    Black,
    Gray,
    /// The separator slot of the palette, which resolves to black
    CustomBlack,
    Background,
    Foreground,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum JpegMatte {
    #[default]
    White,
    Black,
    Gray,
    None,
    Background,
    Foreground,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum ColorReduction {
    Perceptual,
    #[default]
    Selective,
    Adaptive,
    #[strum(serialize = "restrictive", serialize = "web")]
    #[serde(alias = "web")]
    Restrictive,
    /// Not encodable; rejected by validation
    Custom,
    BlackWhite,
    Grayscale,
    MacOs,
    Windows,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum Dither {
    #[default]
    None,
    Diffusion,
    Pattern,
    Noise,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum JpegEncoding {
    StandardBaseline,
    #[default]
    OptimizedBaseline,
    Progressive,
}

impl JpegEncoding {
    /// Resolve the two checkboxes; progressive wins over optimized.
    pub fn from_flags(optimized: bool, progressive: bool) -> Self {
        if progressive {
            JpegEncoding::Progressive
        } else if optimized {
            JpegEncoding::OptimizedBaseline
        } else {
            JpegEncoding::StandardBaseline
        }
    }

    pub fn scans(self) -> Option<u8> {
        match self {
            JpegEncoding::Progressive => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
pub enum TargaDepth {
    #[strum(serialize = "16")]
    #[serde(rename = "16")]
    Sixteen,
    #[strum(serialize = "24")]
    #[serde(rename = "24")]
    TwentyFour,
    #[default]
    #[strum(serialize = "32")]
    #[serde(rename = "32")]
    ThirtyTwo,
}

impl TargaDepth {
    pub fn bits(self) -> u8 {
        match self {
            TargaDepth::Sixteen => 16,
            TargaDepth::TwentyFour => 24,
            TargaDepth::ThirtyTwo => 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Png24Options {
    pub interlaced: bool,
    pub transparency: bool,
    pub matte: MatteColor,
}

impl Default for Png24Options {
    fn default() -> Self {
        Self {
            interlaced: false,
            transparency: true,
            matte: MatteColor::White,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Png8Options {
    pub color_reduction: ColorReduction,
    /// Palette size, 2..=256
    pub colors: u16,
    pub dither: Dither,
    /// Percentage, used by diffusion only
    pub dither_amount: u8,
    pub interlaced: bool,
    pub transparency: bool,
    pub matte: MatteColor,
    /// Used only when `transparency` is on
    pub transparency_dither: Dither,
    pub transparency_dither_amount: u8,
}

impl Default for Png8Options {
    fn default() -> Self {
        Self {
            color_reduction: ColorReduction::Selective,
            colors: DEFAULT_PALETTE_SIZE,
            dither: Dither::None,
            dither_amount: 100,
            interlaced: false,
            transparency: true,
            matte: MatteColor::White,
            transparency_dither: Dither::None,
            transparency_dither_amount: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct JpegOptions {
    /// 0..=12
    pub quality: u8,
    pub matte: JpegMatte,
    pub embed_color_profile: bool,
    pub encoding: JpegEncoding,
}

impl Default for JpegOptions {
    fn default() -> Self {
        Self {
            quality: 12,
            matte: JpegMatte::White,
            embed_color_profile: false,
            encoding: JpegEncoding::OptimizedBaseline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct TargaOptions {
    pub depth: TargaDepth,
    pub alpha_channel: bool,
    pub rle_compression: bool,
}

impl Default for TargaOptions {
    fn default() -> Self {
        Self {
            depth: TargaDepth::ThirtyTwo,
            alpha_channel: true,
            rle_compression: true,
        }
    }
}

/// Per-format encoding parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatParameters {
    Png24(Png24Options),
    Png8(Png8Options),
    Jpeg(JpegOptions),
    Targa(TargaOptions),
}

impl FormatParameters {
    pub fn format(&self) -> Format {
        match self {
            FormatParameters::Png24(_) => Format::Png24,
            FormatParameters::Png8(_) => Format::Png8,
            FormatParameters::Jpeg(_) => Format::Jpeg,
            FormatParameters::Targa(_) => Format::Targa,
        }
    }

    pub fn defaults_for(format: Format) -> Self {
        match format {
            Format::Png24 => FormatParameters::Png24(Png24Options::default()),
            Format::Png8 => FormatParameters::Png8(Png8Options::default()),
            Format::Jpeg => FormatParameters::Jpeg(JpegOptions::default()),
            Format::Targa => FormatParameters::Targa(TargaOptions::default()),
        }
    }

    fn validate(&self) -> ExportResult<()> {
        let invalid = |msg: String| Err(ExportError::InvalidConfiguration(msg));
        match self {
            FormatParameters::Png24(_) | FormatParameters::Targa(_) => Ok(()),
            FormatParameters::Png8(png8) => {
                if !(MIN_PALETTE_SIZE..=MAX_PALETTE_SIZE).contains(&png8.colors) {
                    return invalid(format!("palette size {} outside 2..=256", png8.colors));
                }
                if png8.dither_amount > 100 || png8.transparency_dither_amount > 100 {
                    return invalid("dither amount above 100%".to_string());
                }
                if png8.color_reduction == ColorReduction::Custom {
                    return invalid("custom colour reduction cannot be exported".to_string());
                }
                Ok(())
            }
            FormatParameters::Jpeg(jpeg) if jpeg.quality > 12 => {
                invalid(format!("JPEG quality {} outside 0..=12", jpeg.quality))
            }
            FormatParameters::Jpeg(_) => Ok(()),
        }
    }
}

pub const MIN_PALETTE_SIZE: u16 = 2;
pub const MAX_PALETTE_SIZE: u16 = 256;
pub const DEFAULT_PALETTE_SIZE: u16 = 256;

/// Read a palette size typed by a user.
///
/// Takes the leading integer of `text`, clamps it to `2..=256`, and falls back
/// to 256 when there is no number at all.
pub fn parse_palette_size(text: &str) -> u16 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if end == 0 {
        return DEFAULT_PALETTE_SIZE;
    }
    if negative {
        return MIN_PALETTE_SIZE;
    }
    match digits[..end].parse::<u64>() {
        Ok(n) => n.clamp(MIN_PALETTE_SIZE as u64, MAX_PALETTE_SIZE as u64) as u16,
        // Too many digits to fit: clearly above the maximum
        Err(_) => MAX_PALETTE_SIZE,
    }
}

/// Validated export settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    parameters: FormatParameters,
    destination: PathBuf,
    prefix: String,
    visible_only: bool,
}

impl ExportConfig {
    pub fn format(&self) -> Format {
        self.parameters.format()
    }

    pub fn parameters(&self) -> &FormatParameters {
        &self.parameters
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Normalised prefix: empty, or trimmed text followed by one space
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn visible_only(&self) -> bool {
        self.visible_only
    }

    pub fn extension(&self) -> &'static str {
        self.format().extension()
    }
}

/// Collects settings and validates them into an [`ExportConfig`]
#[derive(Debug, Clone)]
pub struct ExportConfigBuilder {
    format: Format,
    parameters: Option<FormatParameters>,
    destination: PathBuf,
    prefix: String,
    visible_only: bool,
}

impl ExportConfigBuilder {
    pub fn new(format: Format, destination: impl Into<PathBuf>) -> Self {
        Self {
            format,
            parameters: None,
            destination: destination.into(),
            prefix: String::new(),
            visible_only: false,
        }
    }

    /// Parameters for the format; defaults are used when never set
    pub fn parameters(mut self, parameters: FormatParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn visible_only(mut self, visible_only: bool) -> Self {
        self.visible_only = visible_only;
        self
    }

    /// Validate without touching the file system beyond metadata lookups.
    pub fn finalize(self) -> ExportResult<ExportConfig> {
        let parameters = self
            .parameters
            .unwrap_or_else(|| FormatParameters::defaults_for(self.format));
        if parameters.format() != self.format {
            return Err(ExportError::InvalidConfiguration(format!(
                "{} parameters given for {} output",
                parameters.format(),
                self.format
            )));
        }
        parameters.validate()?;
        check_destination(&self.destination)?;

        let mut prefix = self.prefix.trim().to_string();
        if !prefix.is_empty() {
            prefix.push(' ');
        }

        Ok(ExportConfig {
            parameters,
            destination: self.destination,
            prefix,
            visible_only: self.visible_only,
        })
    }
}

/// The folder must be a directory, or creatable under its nearest existing ancestor.
fn check_destination(destination: &Path) -> ExportResult<()> {
    if destination.as_os_str().is_empty() {
        return Err(ExportError::InvalidConfiguration("no destination folder".to_string()));
    }
    let mut current = Some(destination);
    while let Some(path) = current {
        if path.exists() {
            return if path.is_dir() {
                Ok(())
            } else {
                Err(ExportError::InvalidConfiguration(format!(
                    "{} is not a folder",
                    path.display()
                )))
            };
        }
        current = path.parent().filter(|p| !p.as_os_str().is_empty());
    }
    // Relative path with no existing component: created under the working directory
    Ok(())
}
