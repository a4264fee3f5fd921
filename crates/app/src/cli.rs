//! Command-line arguments

use crate::settings::{default_destination, Settings};
use clap::{ArgAction, Parser};
use export::{
    parse_palette_size, ColorReduction, Dither, ExportConfig, ExportConfigBuilder, ExportResult,
    Format, FormatParameters, JpegEncoding, JpegMatte, MatteColor, TargaDepth,
};
use std::path::{Path, PathBuf};

/// Export every layer of a document to its own image file.
#[derive(Parser, Debug)]
#[command(name = "layer-export", version)]
pub struct Cli {
    /// Document manifest (TOML).
    pub manifest: PathBuf,

    /// Output format: png-24, png-8, jpg or tga.
    #[arg(short, long)]
    pub format: Option<Format>,

    /// Destination folder; defaults to the manifest's folder.
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Text put in front of every file name.
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Export only layers that are visible.
    #[arg(long)]
    pub visible_only: bool,

    /// Settings file with per-format options.
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// PNG: interlace the output.
    #[arg(long)]
    pub interlaced: bool,

    /// PNG: flatten transparency onto the matte.
    #[arg(long)]
    pub no_transparency: bool,

    /// PNG: white, black, gray, custom-black, background or foreground.
    #[arg(long)]
    pub matte: Option<MatteColor>,

    /// PNG-8: colour reduction algorithm.
    #[arg(long)]
    pub reduction: Option<ColorReduction>,

    /// PNG-8: palette size, 2 to 256.
    #[arg(long)]
    pub colors: Option<String>,

    /// PNG-8: none, diffusion, pattern or noise.
    #[arg(long)]
    pub dither: Option<Dither>,

    /// PNG-8: diffusion dither amount in percent.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub dither_amount: Option<u8>,

    /// PNG-8: dither used on transparent edges.
    #[arg(long)]
    pub transparency_dither: Option<Dither>,

    /// PNG-8: transparency diffusion amount in percent.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub transparency_dither_amount: Option<u8>,

    /// JPEG: quality, 0 to 12.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=12))]
    pub quality: Option<u8>,

    /// JPEG: white, black, gray, none, background or foreground.
    #[arg(long)]
    pub jpeg_matte: Option<JpegMatte>,

    /// JPEG: embed the colour profile.
    #[arg(long)]
    pub embed_profile: bool,

    /// JPEG: standard baseline instead of optimized.
    #[arg(long)]
    pub no_optimize: bool,

    /// JPEG: progressive, three scans.
    #[arg(long)]
    pub progressive: bool,

    /// TGA: 16, 24 or 32 bits per pixel.
    #[arg(long)]
    pub depth: Option<TargaDepth>,

    /// TGA: leave out the alpha channel.
    #[arg(long)]
    pub no_alpha: bool,

    /// TGA: write uncompressed.
    #[arg(long)]
    pub no_rle: bool,

    /// Cancel after this many layers have been exported.
    #[arg(long)]
    pub stop_after: Option<usize>,

    /// Report how long collection and export took.
    #[arg(long)]
    pub profile: bool,

    /// More log output (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// Merge flags over `settings` and validate
    pub fn export_config(&self, settings: &Settings, location: Option<&Path>) -> ExportResult<ExportConfig> {
        let format = self.format.or(settings.format).unwrap_or(Format::Png24);
        let mut parameters = settings.parameters(format);
        self.apply(&mut parameters);

        let destination = self
            .destination
            .clone()
            .or_else(|| settings.destination.clone())
            .unwrap_or_else(|| default_destination(location));
        let prefix = self
            .prefix
            .clone()
            .or_else(|| settings.prefix.clone())
            .unwrap_or_default();
        let visible_only = self.visible_only || settings.visible_only.unwrap_or(false);

        ExportConfigBuilder::new(format, destination)
            .parameters(parameters)
            .prefix(prefix)
            .visible_only(visible_only)
            .finalize()
    }

    fn apply(&self, parameters: &mut FormatParameters) {
        match parameters {
            FormatParameters::Png24(png24) => {
                png24.interlaced |= self.interlaced;
                if self.no_transparency {
                    png24.transparency = false;
                }
                if let Some(matte) = self.matte {
                    png24.matte = matte;
                }
            }
            FormatParameters::Png8(png8) => {
                png8.interlaced |= self.interlaced;
                if self.no_transparency {
                    png8.transparency = false;
                }
                if let Some(matte) = self.matte {
                    png8.matte = matte;
                }
                if let Some(reduction) = self.reduction {
                    png8.color_reduction = reduction;
                }
                if let Some(colors) = &self.colors {
                    png8.colors = parse_palette_size(colors);
                }
                if let Some(dither) = self.dither {
                    png8.dither = dither;
                }
                if let Some(amount) = self.dither_amount {
                    png8.dither_amount = amount;
                }
                if let Some(dither) = self.transparency_dither {
                    png8.transparency_dither = dither;
                }
                if let Some(amount) = self.transparency_dither_amount {
                    png8.transparency_dither_amount = amount;
                }
            }
            FormatParameters::Jpeg(jpeg) => {
                if let Some(quality) = self.quality {
                    jpeg.quality = quality;
                }
                if let Some(matte) = self.jpeg_matte {
                    jpeg.matte = matte;
                }
                jpeg.embed_color_profile |= self.embed_profile;
                let optimized = jpeg.encoding != JpegEncoding::StandardBaseline && !self.no_optimize;
                let progressive = jpeg.encoding == JpegEncoding::Progressive || self.progressive;
                jpeg.encoding = JpegEncoding::from_flags(optimized, progressive);
            }
            FormatParameters::Targa(targa) => {
                if let Some(depth) = self.depth {
                    targa.depth = depth;
                }
                if self.no_alpha {
                    targa.alpha_channel = false;
                }
                if self.no_rle {
                    targa.rle_compression = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("layer-export").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::parse("format = \"jpg\"\nprefix = \"from file\"\n[jpeg]\nquality = 5").unwrap();
        let dest = dir.path().to_string_lossy().into_owned();
        let cli = parse(&["doc.toml", "-d", dest.as_str(), "--progressive", "--prefix", " cli "]);

        let config = cli.export_config(&settings, None).unwrap();
        assert_eq!(config.format(), Format::Jpeg);
        assert_eq!(config.prefix(), "cli ");
        let FormatParameters::Jpeg(jpeg) = config.parameters() else {
            panic!("expected JPEG parameters");
        };
        assert_eq!(jpeg.quality, 5);
        assert_eq!(jpeg.encoding, JpegEncoding::Progressive);
    }

    #[test]
    fn png8_flags() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().to_string_lossy().into_owned();
        let cli = parse(&[
            "doc.toml", "-f", "png-8", "-d", dest.as_str(), "--colors", "300", "--dither", "diffusion",
            "--dither-amount", "40", "--reduction", "web", "--no-transparency",
        ]);
        let config = cli.export_config(&Settings::default(), None).unwrap();
        let FormatParameters::Png8(png8) = config.parameters() else {
            panic!("expected PNG-8 parameters");
        };
        assert_eq!(png8.colors, 256);
        assert_eq!(png8.dither, Dither::Diffusion);
        assert_eq!(png8.dither_amount, 40);
        assert_eq!(png8.color_reduction, ColorReduction::Restrictive);
        assert!(!png8.transparency);
    }

    #[test]
    fn destination_follows_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("doc.toml");
        let cli = parse(&["doc.toml", "--format", "tga", "--depth", "24", "--no-rle"]);
        let config = cli.export_config(&Settings::default(), Some(&manifest)).unwrap();
        assert_eq!(config.destination(), dir.path());
        assert_eq!(config.extension(), ".tga");
        let FormatParameters::Targa(targa) = config.parameters() else {
            panic!("expected Targa parameters");
        };
        assert_eq!(targa.depth, TargaDepth::TwentyFour);
        assert!(!targa.rle_compression);
        assert!(targa.alpha_channel);
    }

    #[test]
    fn rejects_bad_values() {
        let args = ["layer-export", "doc.toml", "--quality", "13"];
        assert!(Cli::try_parse_from(args).is_err());
        let args = ["layer-export", "doc.toml", "--format", "gif"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn verbosity() {
        assert_eq!(parse(&["d.toml"]).log_level(), log::LevelFilter::Warn);
        assert_eq!(parse(&["d.toml", "-vv"]).log_level(), log::LevelFilter::Debug);
    }
}
