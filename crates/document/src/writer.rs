//! File writers used by the in-memory host

use crate::raster::flatten;
use crate::{HostError, HostResult};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::imageops::{self, ColorMap};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use rgb::{RGB8, RGBA8};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Alpha below this becomes the transparent palette entry
const ALPHA_CUTOFF: u8 = 128;

/// Palette source for indexed output
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reduction {
    /// Built from the image's own colours
    Adaptive,
    /// 6x6x6 web-safe cube
    Web,
    /// Named fixed palette
    Fixed(String),
}

#[derive(Debug, Clone)]
pub(crate) struct IndexedPng {
    pub reduction: Reduction,
    pub colors: usize,
    /// Error diffusion strength, 0.0 to 1.0
    pub dithering: f32,
    pub transparency: bool,
    pub matte: RGB8,
}

fn create(path: &Path) -> HostResult<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Truecolour PNG; alpha is kept or flattened on `matte`
pub(crate) fn write_png24(path: &Path, image: &RgbaImage, transparency: bool, matte: RGB8) -> HostResult<()> {
    let encoder = PngEncoder::new(create(path)?);
    if transparency {
        encoder.write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)?;
    } else {
        let flat = flatten(image, matte);
        encoder.write_image(flat.as_raw(), flat.width(), flat.height(), ExtendedColorType::Rgb8)?;
    }
    Ok(())
}

pub(crate) fn write_jpeg(path: &Path, image: &RgbaImage, quality: u8, matte: Option<RGB8>) -> HostResult<()> {
    let flat = match matte {
        Some(matte) => flatten(image, matte),
        None => DynamicImage::ImageRgba8(image.clone()).into_rgb8(),
    };
    // 0..=12 host scale onto the encoder's 1..=100
    let quality = 10 + (quality.min(12) as u32 * 90 / 12) as u8;
    let encoder = JpegEncoder::new_with_quality(create(path)?, quality);
    encoder.write_image(flat.as_raw(), flat.width(), flat.height(), ExtendedColorType::Rgb8)?;
    Ok(())
}

pub(crate) fn write_targa(path: &Path, image: &RgbaImage, bits: u8, alpha: bool, rle: bool) -> HostResult<()> {
    if bits != 24 && bits != 32 {
        return Err(HostError::Unsupported(format!("{bits}-bit targa")));
    }
    let mut encoder = TgaEncoder::new(create(path)?);
    if !rle {
        encoder = encoder.disable_rle();
    }
    match (bits, alpha) {
        (32, true) => {
            encoder.write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)?;
        }
        _ => {
            let flat = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
            encoder.write_image(flat.as_raw(), flat.width(), flat.height(), ExtendedColorType::Rgb8)?;
        }
    }
    Ok(())
}

/// Palette-reduced PNG, transparent pixels share one palette entry
pub(crate) fn write_png8(path: &Path, image: &RgbaImage, options: &IndexedPng) -> HostResult<()> {
    let colors = options.colors.clamp(2, 256);
    let (palette, trns, indices) = match &options.reduction {
        Reduction::Adaptive => quantize(image, colors, options)?,
        fixed => {
            let slot = usize::from(options.transparency);
            let palette = FixedPalette::new(fixed, colors - slot)?;
            remap(image, &palette, options)
        }
    };

    let (width, height) = image.dimensions();
    let mut encoder = png::Encoder::new(create(path)?, width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(palette);
    if let Some(trns) = trns {
        encoder.set_trns(trns);
    }
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&indices)?;
    Ok(())
}

type Indexed = (Vec<u8>, Option<Vec<u8>>, Vec<u8>);

/// Adaptive palette through libimagequant
fn quantize(image: &RgbaImage, colors: usize, options: &IndexedPng) -> HostResult<Indexed> {
    let pixels: Vec<RGBA8> = if options.transparency {
        image
            .pixels()
            .map(|Rgba([r, g, b, a])| {
                if *a < ALPHA_CUTOFF {
                    RGBA8::new(0, 0, 0, 0)
                } else {
                    RGBA8::new(*r, *g, *b, 255)
                }
            })
            .collect()
    } else {
        flatten(image, options.matte)
            .pixels()
            .map(|Rgb([r, g, b])| RGBA8::new(*r, *g, *b, 255))
            .collect()
    };

    let mut attributes = imagequant::new();
    attributes.set_max_colors(colors as u32)?;
    let mut liq_image = attributes.new_image(pixels, image.width() as usize, image.height() as usize, 0.0)?;
    let mut result = attributes.quantize(&mut liq_image)?;
    result.set_dithering_level(options.dithering)?;
    let (palette, indices) = result.remapped(&mut liq_image)?;

    let rgb = palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
    let trns = options.transparency.then(|| palette.iter().map(|c| c.a).collect());
    Ok((rgb, trns, indices))
}

/// Fixed palette, entry 0 reserved for transparency when enabled
fn remap(image: &RgbaImage, palette: &FixedPalette, options: &IndexedPng) -> Indexed {
    let mut rgb: RgbImage = if options.transparency {
        DynamicImage::ImageRgba8(image.clone()).into_rgb8()
    } else {
        flatten(image, options.matte)
    };
    if options.dithering > 0.0 {
        imageops::dither(&mut rgb, palette);
    }
    let mapped = imageops::index_colors(&rgb, palette);

    let slot = u8::from(options.transparency);
    let indices = mapped
        .pixels()
        .zip(image.pixels())
        .map(|(Luma([index]), Rgba([_, _, _, a]))| {
            if options.transparency && *a < ALPHA_CUTOFF {
                0
            } else {
                index + slot
            }
        })
        .collect();

    let mut bytes = Vec::with_capacity((palette.0.len() + 1) * 3);
    if options.transparency {
        bytes.extend_from_slice(&[0, 0, 0]);
    }
    bytes.extend(palette.0.iter().flat_map(|c| [c.r, c.g, c.b]));
    (bytes, options.transparency.then(|| vec![0]), indices)
}

/// Named palette used with `imageops::dither`
struct FixedPalette(Vec<RGB8>);

impl FixedPalette {
    fn new(reduction: &Reduction, budget: usize) -> HostResult<Self> {
        let mut colors = match reduction {
            Reduction::Web => web_cube(),
            Reduction::Fixed(name) => match name.as_str() {
                "Black & White" => vec![RGB8::new(0, 0, 0), RGB8::new(255, 255, 255)],
                "Grayscale" => {
                    let levels = budget.max(2);
                    (0..levels)
                        .map(|i| {
                            let v = (i * 255 / (levels - 1)) as u8;
                            RGB8::new(v, v, v)
                        })
                        .collect()
                }
                // System palettes approximated by the web cube
                "Mac OS" | "Windows" => web_cube(),
                other => return Err(HostError::Unsupported(format!("palette '{other}'"))),
            },
            Reduction::Adaptive => return Err(HostError::Unsupported("adaptive palette".to_string())),
        };
        colors.truncate(budget.max(1));
        Ok(Self(colors))
    }
}

impl ColorMap for FixedPalette {
    type Color = Rgb<u8>;

    fn index_of(&self, color: &Rgb<u8>) -> usize {
        let [r, g, b] = color.0;
        let distance = |c: &RGB8| {
            let d = |x: u8, y: u8| (i32::from(x) - i32::from(y)).pow(2);
            d(r, c.r) + d(g, c.g) + d(b, c.b)
        };
        self.0
            .iter()
            .enumerate()
            .min_by_key(|&(_, c)| distance(c))
            .map_or(0, |(i, _)| i)
    }

    fn lookup(&self, index: usize) -> Option<Rgb<u8>> {
        self.0.get(index).map(|c| Rgb([c.r, c.g, c.b]))
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        if let Some(mapped) = self.lookup(self.index_of(color)) {
            *color = mapped;
        }
    }
}

fn web_cube() -> Vec<RGB8> {
    let steps = [0u8, 51, 102, 153, 204, 255];
    steps
        .into_iter()
        .flat_map(|r| steps.into_iter().flat_map(move |g| steps.into_iter().map(move |b| RGB8::new(r, g, b))))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn options(reduction: Reduction, colors: usize) -> IndexedPng {
        IndexedPng {
            reduction,
            colors,
            dithering: 0.0,
            transparency: true,
            matte: RGB8::new(255, 255, 255),
        }
    }

    #[test]
    fn fixed_palette_names() {
        let bw = FixedPalette::new(&Reduction::Fixed("Black & White".into()), 255).unwrap();
        assert_eq!(bw.0.len(), 2);
        let gray = FixedPalette::new(&Reduction::Fixed("Grayscale".into()), 16).unwrap();
        assert_eq!(gray.0.len(), 16);
        assert_eq!(FixedPalette::new(&Reduction::Web, 256).unwrap().0.len(), 216);
        assert!(FixedPalette::new(&Reduction::Fixed("Amiga".into()), 16).is_err());
    }

    #[test]
    fn fixed_palette_dithers_mid_gray() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([128, 128, 128, 255]));
        let palette = FixedPalette::new(&Reduction::Fixed("Black & White".into()), 2).unwrap();

        let (_, _, flat) = remap(&image, &palette, &options(Reduction::Web, 3));
        assert!(flat.windows(2).all(|w| w[0] == w[1]));

        let dithered = IndexedPng { dithering: 1.0, ..options(Reduction::Web, 3) };
        let (bytes, trns, indices) = remap(&image, &palette, &dithered);
        assert_eq!(bytes.len(), 9);
        assert_eq!(trns, Some(vec![0]));
        assert!(indices.contains(&1) && indices.contains(&2));
    }

    #[test]
    fn png8_round_trips_through_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));

        write_png8(&path, &image, &options(Reduction::Adaptive, 256)).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
        let [r, g, b, a] = decoded.get_pixel(1, 0).0;
        assert!(r > 245 && g < 10 && b < 10);
        assert_eq!(a, 255);
    }

    #[test]
    fn opaque_png8_uses_matte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let opaque = IndexedPng {
            transparency: false,
            matte: RGB8::new(0, 0, 0),
            ..options(Reduction::Fixed("Black & White".into()), 2)
        };

        write_png8(&path, &image, &opaque).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert!(decoded.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn sixteen_bit_targa_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tga");
        let image = RgbaImage::new(1, 1);
        assert!(matches!(
            write_targa(&path, &image, 16, true, true),
            Err(HostError::Unsupported(_))
        ));
        assert!(!path.exists());
    }
}
