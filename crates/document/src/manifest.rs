//! Document manifests
//!
//! A TOML description of a layered document. Layers are listed the way a
//! layers panel shows them: topmost first. A layer with a `layers` table is
//! a group.
//!
//! ```toml
//! width = 64
//! height = 64
//!
//! [background]
//! color = [255, 255, 255]
//!
//! [[layers]]
//! name = "Sun"
//! fill = [255, 200, 0, 255]
//! rect = [40, 4, 16, 16]
//!
//! [[layers]]
//! name = "Scenery"
//! visible = false
//!
//! [[layers.layers]]
//! name = "Hills"
//! image = "hills.png"
//! ```

use crate::{HostError, HostResult, LayerHost, LayerId, MemoryDocument, Raster, Rect};
use rgb::{RGB8, RGBA8};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

fn default_background_name() -> String {
    "Background".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackgroundSpec {
    #[serde(default = "default_background_name")]
    pub name: String,
    #[serde(default)]
    pub color: Option<[u8; 3]>,
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub visible: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// RGBA fill
    #[serde(default)]
    pub fill: Option<[u8; 4]>,
    /// `[x, y, width, height]` of the fill; the whole canvas when absent
    #[serde(default)]
    pub rect: Option<[i32; 4]>,
    /// Image file, relative to the manifest
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub offset: Option<[i32; 2]>,
    /// Children, topmost first
    #[serde(default)]
    pub layers: Option<Vec<LayerSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub background: Option<BackgroundSpec>,
    #[serde(default)]
    pub background_color: Option<[u8; 3]>,
    #[serde(default)]
    pub foreground_color: Option<[u8; 3]>,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl Manifest {
    pub fn parse(text: &str) -> HostResult<Self> {
        let manifest: Manifest = toml::from_str(text).map_err(|e| HostError::Manifest(e.to_string()))?;
        if manifest.width == 0 || manifest.height == 0 {
            return Err(HostError::Manifest("canvas must not be empty".to_string()));
        }
        Ok(manifest)
    }

    /// Read a manifest file and build its document
    pub fn load(path: &Path) -> HostResult<MemoryDocument> {
        let text = std::fs::read_to_string(path)?;
        let manifest = Self::parse(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut document = manifest.build(base)?;
        document.set_location(path);
        Ok(document)
    }

    /// Build the document, resolving image paths against `base`
    pub fn build(&self, base: &Path) -> HostResult<MemoryDocument> {
        let mut document = MemoryDocument::new(self.width, self.height);
        let canvas = Rect::new(0, 0, self.width, self.height);

        document.set_colors(
            self.background_color.map(rgb).unwrap_or(RGB8::new(255, 255, 255)),
            self.foreground_color.map(rgb).unwrap_or(RGB8::new(0, 0, 0)),
        );

        if let Some(spec) = &self.background {
            let raster = match (&spec.image, spec.color) {
                (Some(image), _) => Raster::open(&base.join(image), 0, 0)?,
                (None, color) => {
                    let [r, g, b] = color.unwrap_or([255, 255, 255]);
                    Raster::solid(canvas, RGBA8::new(r, g, b, 255))
                }
            };
            let id = document.set_background(spec.name.clone(), raster);
            if !spec.visible {
                document.set_visible(id, false)?;
            }
        }

        add_layers(&mut document, None, &self.layers, base, canvas)?;
        document.reset_stats();
        Ok(document)
    }
}

fn rgb([r, g, b]: [u8; 3]) -> RGB8 {
    RGB8::new(r, g, b)
}

fn add_layers(
    document: &mut MemoryDocument,
    parent: Option<LayerId>,
    specs: &[LayerSpec],
    base: &Path,
    canvas: Rect,
) -> HostResult<()> {
    // Listed topmost first, built bottom up
    for spec in specs.iter().rev() {
        let id = match &spec.layers {
            Some(children) => {
                if spec.fill.is_some() || spec.image.is_some() {
                    return Err(HostError::Manifest(format!(
                        "group '{}' cannot have a fill or an image",
                        spec.name
                    )));
                }
                let group = document.add_group(parent, spec.name.clone())?;
                add_layers(document, Some(group), children, base, canvas)?;
                group
            }
            None => {
                let raster = layer_raster(spec, base, canvas)?;
                document.add_layer(parent, spec.name.clone(), raster)?
            }
        };
        if !spec.visible {
            document.set_visible(id, false)?;
        }
    }
    Ok(())
}

fn layer_raster(spec: &LayerSpec, base: &Path, canvas: Rect) -> HostResult<Raster> {
    let [x, y] = spec.offset.unwrap_or([0, 0]);
    match (&spec.image, spec.fill) {
        (Some(_), Some(_)) => Err(HostError::Manifest(format!(
            "layer '{}' has both a fill and an image",
            spec.name
        ))),
        (Some(image), None) => Raster::open(&base.join(image), x, y),
        (None, fill) => {
            let rect = match spec.rect {
                Some([x, y, w, h]) if w > 0 && h > 0 => Rect::new(x, y, w as u32, h as u32),
                Some(_) => {
                    return Err(HostError::Manifest(format!(
                        "layer '{}' has an empty rect",
                        spec.name
                    )))
                }
                None => canvas,
            };
            let [r, g, b, a] = fill.unwrap_or([0, 0, 0, 0]);
            Ok(Raster::solid(rect, RGBA8::new(r, g, b, a)))
        }
    }
}
