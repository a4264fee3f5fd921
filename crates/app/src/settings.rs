//! Settings file
//!
//! Optional TOML file with the export choices and one table per format.
//! Command-line flags win over anything set here.
//!
//! ```toml
//! format = "png-8"
//! prefix = "v2"
//! visible-only = true
//!
//! [png8]
//! color-reduction = "adaptive"
//! colors = 64
//! ```

use anyhow::Context;
use export::{Format, FormatParameters, JpegOptions, Png24Options, Png8Options, TargaOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
    pub format: Option<Format>,
    pub destination: Option<PathBuf>,
    pub prefix: Option<String>,
    pub visible_only: Option<bool>,
    pub png24: Png24Options,
    pub png8: Png8Options,
    pub jpeg: JpegOptions,
    pub targa: TargaOptions,
}

impl Settings {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("Invalid settings file")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::parse(&text)
    }

    /// Parameters stored for `format`
    pub fn parameters(&self, format: Format) -> FormatParameters {
        match format {
            Format::Png24 => FormatParameters::Png24(self.png24.clone()),
            Format::Png8 => FormatParameters::Png8(self.png8.clone()),
            Format::Jpeg => FormatParameters::Jpeg(self.jpeg.clone()),
            Format::Targa => FormatParameters::Targa(self.targa.clone()),
        }
    }
}

/// Folder of the document, else the user's documents folder
pub fn default_destination(location: Option<&Path>) -> PathBuf {
    match location.and_then(Path::parent) {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_path_buf(),
        None => dirs::document_dir().unwrap_or_else(|| PathBuf::from(".")),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use export::{ColorReduction, JpegEncoding, TargaDepth};

    #[test]
    fn empty_file_gives_dialog_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings.format, None);
        assert_eq!(settings.parameters(Format::Png8), FormatParameters::Png8(Png8Options::default()));
        assert_eq!(settings.jpeg.quality, 12);
        assert_eq!(settings.jpeg.encoding, JpegEncoding::OptimizedBaseline);
        assert_eq!(settings.targa.depth, TargaDepth::ThirtyTwo);
    }

    #[test]
    fn reads_tables() {
        let settings = Settings::parse(
            r#"
format = "png-8"
prefix = "v2"
visible-only = true

[png8]
color-reduction = "grayscale"
colors = 16
"#,
        )
        .unwrap();
        assert_eq!(settings.format, Some(Format::Png8));
        assert_eq!(settings.prefix.as_deref(), Some("v2"));
        assert_eq!(settings.visible_only, Some(true));
        assert_eq!(settings.png8.color_reduction, ColorReduction::Grayscale);
        assert_eq!(settings.png8.colors, 16);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(Settings::parse("speed = 3").is_err());
        assert!(Settings::parse("[jpeg]\nqualty = 3").is_err());
    }

    #[test]
    fn destination_defaults() {
        assert_eq!(
            default_destination(Some(Path::new("/art/poster.toml"))),
            PathBuf::from("/art")
        );
        assert_eq!(default_destination(Some(Path::new("poster.toml"))), PathBuf::from("."));
        let fallback = default_destination(None);
        assert!(!fallback.as_os_str().is_empty());
    }
}
