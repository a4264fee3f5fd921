//! Raster layer content and compositing

use crate::{HostResult, Rect};
use image::{DynamicImage, ImageBuffer, RgbImage, Rgba, RgbaImage};
use rgb::{RGB8, RGBA8};
use std::path::Path;

/// Pixels of one layer, placed at an offset in document space
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub image: RgbaImage,
    pub x: i32,
    pub y: i32,
}

impl Raster {
    /// Solid fill covering `rect`
    pub fn solid(rect: Rect, color: RGBA8) -> Self {
        let image = ImageBuffer::from_pixel(
            rect.width,
            rect.height,
            Rgba([color.r, color.g, color.b, color.a]),
        );
        Self { image, x: rect.x, y: rect.y }
    }

    pub fn from_image(image: RgbaImage, x: i32, y: i32) -> Self {
        Self { image, x, y }
    }

    /// Load an image file as layer content
    pub fn open(path: &Path, x: i32, y: i32) -> HostResult<Self> {
        let image = image::open(path)?.to_rgba8();
        Ok(Self { image, x, y })
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.image.width(), self.image.height())
    }

    /// Source-over blend onto `canvas`
    pub fn composite_onto(&self, canvas: &mut RgbaImage) {
        let canvas_rect = Rect::new(0, 0, canvas.width(), canvas.height());
        if !self.bounds().intersects(&canvas_rect) {
            return;
        }
        image::imageops::overlay(canvas, &self.image, self.x as i64, self.y as i64);
    }

    /// Crop to the part lying inside `rect`
    pub fn crop(&self, rect: &Rect) -> Raster {
        let bounds = self.bounds();
        let left = bounds.x.max(rect.x);
        let top = bounds.y.max(rect.y);
        let right = bounds.right().min(rect.right());
        let bottom = bounds.bottom().min(rect.bottom());
        if right <= left || bottom <= top {
            return Raster::from_image(RgbaImage::new(0, 0), left, top);
        }

        let cropped = image::imageops::crop_imm(
            &self.image,
            (left - bounds.x) as u32,
            (top - bounds.y) as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
        .to_image();
        Raster::from_image(cropped, left, top)
    }
}

/// Flatten alpha against a matte colour
pub fn flatten(image: &RgbaImage, matte: RGB8) -> RgbImage {
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), Rgba([matte.r, matte.g, matte.b, 255]));
    image::imageops::overlay(&mut canvas, image, 0, 0);
    DynamicImage::ImageRgba8(canvas).into_rgb8()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn composite_respects_offset_and_alpha() {
        let mut canvas = RgbaImage::new(4, 4);
        let layer = Raster::solid(Rect::new(2, 2, 4, 4), RGBA8::new(255, 0, 0, 255));
        layer.composite_onto(&mut canvas);

        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(canvas.get_pixel(3, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn offscreen_layer_is_ignored() {
        let mut canvas = RgbaImage::new(4, 4);
        let layer = Raster::solid(Rect::new(10, 10, 2, 2), RGBA8::new(255, 0, 0, 255));
        layer.composite_onto(&mut canvas);
        assert!(canvas.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn crop_clips_to_rect() {
        let layer = Raster::solid(Rect::new(-2, 1, 6, 2), RGBA8::new(1, 2, 3, 4));
        let cropped = layer.crop(&Rect::new(0, 0, 3, 3));
        assert_eq!(cropped.bounds(), Rect::new(0, 1, 3, 2));
        assert!(cropped.image.pixels().all(|p| p.0 == [1, 2, 3, 4]));
    }

    #[test]
    fn crop_outside_is_empty() {
        let layer = Raster::solid(Rect::new(5, 5, 2, 2), RGBA8::new(1, 2, 3, 4));
        let cropped = layer.crop(&Rect::new(0, 0, 3, 3));
        assert_eq!(cropped.image.dimensions(), (0, 0));
    }

    #[test]
    fn flatten_against_matte() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        image.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let flat = flatten(&image, RGB8::new(255, 255, 255));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [10, 20, 30]);
    }
}
