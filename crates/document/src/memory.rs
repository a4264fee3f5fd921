//! In-memory layered document
//!
//! A raster layer tree that implements [`LayerHost`]. Children are stored
//! bottom to top (paint order). The indexed model is derived from the tree:
//! a group contributes its end marker below its children and its start
//! marker above them.

use crate::host::{LayerDescriptor, LayerHandle, LayerHost, LayerId, LayerSection, SnapshotId};
use crate::raster::Raster;
use crate::save::{ExtensionCase, JpegFormatOptions, MatteType, SaveOptions, TargaBitsPerPixel};
use crate::writer::{self, IndexedPng, Reduction};
use crate::{ActionDescriptor, HostError, HostResult, Rect};
use image::RgbaImage;
use rgb::RGB8;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Calls made against the document, for inspection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub count_queries: usize,
    pub describe_queries: usize,
    pub selections: usize,
    pub visibility_writes: usize,
    pub snapshots_captured: usize,
    pub snapshots_applied: usize,
    pub snapshots_discarded: usize,
    pub encodes: usize,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Group(Vec<LayerId>),
    Layer(Raster),
    Background(Raster),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    visible: bool,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
struct Snapshot {
    visibility: Vec<bool>,
    active: Option<LayerId>,
}

/// Layered raster document held in memory
#[derive(Debug)]
pub struct MemoryDocument {
    width: u32,
    height: u32,
    nodes: Vec<Node>,
    top_level: Vec<LayerId>,
    background: Option<LayerId>,
    active: Option<LayerId>,
    snapshots: HashMap<SnapshotId, Snapshot>,
    background_color: RGB8,
    foreground_color: RGB8,
    location: Option<PathBuf>,
    index: Option<Vec<(LayerId, LayerSection)>>,
    stats: HostStats,
    failing: HashSet<String>,
}

impl MemoryDocument {
    /// Create an empty document
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            nodes: Vec::new(),
            top_level: Vec::new(),
            background: None,
            active: None,
            snapshots: HashMap::new(),
            background_color: RGB8::new(255, 255, 255),
            foreground_color: RGB8::new(0, 0, 0),
            location: None,
            index: None,
            stats: HostStats::default(),
            failing: HashSet::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn canvas(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn node(&self, id: LayerId) -> HostResult<&Node> {
        id.0.checked_sub(1)
            .and_then(|i| self.nodes.get(i as usize))
            .ok_or(HostError::UnknownLayer(id))
    }

    fn node_mut(&mut self, id: LayerId) -> HostResult<&mut Node> {
        id.0.checked_sub(1)
            .and_then(|i| self.nodes.get_mut(i as usize))
            .ok_or(HostError::UnknownLayer(id))
    }

    fn parent_of(&self, id: LayerId) -> Option<LayerId> {
        self.nodes.iter().enumerate().find_map(|(i, node)| match &node.kind {
            NodeKind::Group(children) if children.contains(&id) => Some(LayerId(i as u64 + 1)),
            _ => None,
        })
    }

    fn push_node(&mut self, node: Node) -> LayerId {
        self.nodes.push(node);
        self.index = None;
        LayerId(self.nodes.len() as u64)
    }

    fn attach(&mut self, parent: Option<LayerId>, id: LayerId) -> HostResult<()> {
        match parent {
            None => self.top_level.push(id),
            Some(parent) => match &mut self.node_mut(parent)?.kind {
                NodeKind::Group(children) => children.push(id),
                _ => return Err(HostError::UnknownLayer(parent)),
            },
        }
        Ok(())
    }

    /// Set the base layer, filled with `raster` clipped to the canvas
    pub fn set_background(&mut self, name: impl Into<String>, raster: Raster) -> LayerId {
        let raster = raster.crop(&self.canvas());
        if let Some(id) = self.background {
            if let Ok(node) = self.node_mut(id) {
                node.name = name.into();
                node.kind = NodeKind::Background(raster);
            }
            return id;
        }
        let id = self.push_node(Node {
            name: name.into(),
            visible: true,
            kind: NodeKind::Background(raster),
        });
        self.background = Some(id);
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    /// Add a group on top of `parent` (or of the document)
    pub fn add_group(&mut self, parent: Option<LayerId>, name: impl Into<String>) -> HostResult<LayerId> {
        let id = self.push_node(Node {
            name: name.into(),
            visible: true,
            kind: NodeKind::Group(Vec::new()),
        });
        self.attach(parent, id)?;
        Ok(id)
    }

    /// Add a raster layer on top of `parent` (or of the document) and make it active
    pub fn add_layer(&mut self, parent: Option<LayerId>, name: impl Into<String>, raster: Raster) -> HostResult<LayerId> {
        let raster = raster.crop(&self.canvas());
        let id = self.push_node(Node {
            name: name.into(),
            visible: true,
            kind: NodeKind::Layer(raster),
        });
        self.attach(parent, id)?;
        self.active = Some(id);
        Ok(id)
    }

    pub fn set_colors(&mut self, background: RGB8, foreground: RGB8) {
        self.background_color = background;
        self.foreground_color = foreground;
    }

    /// Where the document lives on disk, if anywhere
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, path: impl Into<PathBuf>) {
        self.location = Some(path.into());
    }

    pub fn name_of(&self, id: LayerId) -> Option<&str> {
        self.node(id).ok().map(|n| n.name.as_str())
    }

    /// Own visibility flag of every node, in creation order
    pub fn visibility(&self) -> Vec<(LayerId, bool)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (LayerId(i as u64 + 1), n.visible))
            .collect()
    }

    pub fn active(&self) -> Option<LayerId> {
        self.active
    }

    /// Select a layer by id, bypassing the indexed model
    pub fn activate(&mut self, id: LayerId) -> HostResult<()> {
        if matches!(self.node(id)?.kind, NodeKind::Group(_)) {
            return Err(HostError::UnknownLayer(id));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = HostStats::default();
    }

    /// Snapshots captured and not yet discarded
    pub fn live_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    /// Make every encode fail while a layer named `name` is visible
    pub fn fail_encoding_for(&mut self, name: impl Into<String>) {
        self.failing.insert(name.into());
    }

    fn index_entries(&mut self) -> &[(LayerId, LayerSection)] {
        if self.index.is_none() {
            let mut entries = Vec::new();
            self.flatten_into(&self.top_level, &mut entries);
            self.index = Some(entries);
        }
        self.index.as_deref().unwrap_or_default()
    }

    fn flatten_into(&self, children: &[LayerId], entries: &mut Vec<(LayerId, LayerSection)>) {
        for &id in children {
            let Ok(node) = self.node(id) else { continue };
            match &node.kind {
                NodeKind::Group(grandchildren) => {
                    entries.push((id, LayerSection::GroupEnd));
                    self.flatten_into(grandchildren, entries);
                    entries.push((id, LayerSection::GroupStart));
                }
                NodeKind::Layer(_) => entries.push((id, LayerSection::Content)),
                NodeKind::Background(_) => {}
            }
        }
    }

    fn entry(&mut self, index: usize) -> HostResult<(LayerId, LayerSection)> {
        index
            .checked_sub(1)
            .and_then(|i| self.index_entries().get(i).copied())
            .ok_or(HostError::IndexOutOfRange(index))
    }

    fn handle(&self, id: LayerId) -> HostResult<LayerHandle> {
        let node = self.node(id)?;
        Ok(LayerHandle {
            id,
            name: node.name.clone(),
            is_background: matches!(node.kind, NodeKind::Background(_)),
        })
    }

    /// Leaves currently contributing to the composite, bottom to top
    fn visible_leaves(&self) -> Vec<LayerId> {
        fn walk(doc: &MemoryDocument, children: &[LayerId], out: &mut Vec<LayerId>) {
            for &id in children {
                let Ok(node) = doc.node(id) else { continue };
                if !node.visible {
                    continue;
                }
                match &node.kind {
                    NodeKind::Group(grandchildren) => walk(doc, grandchildren, out),
                    _ => out.push(id),
                }
            }
        }

        let mut out = Vec::new();
        if let Some(bg) = self.background {
            if self.node(bg).map(|n| n.visible).unwrap_or(false) {
                out.push(bg);
            }
        }
        walk(self, &self.top_level, &mut out);
        out
    }

    /// Render the visible layers
    pub fn composite(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        for id in self.visible_leaves() {
            if let Ok(node) = self.node(id) {
                if let NodeKind::Layer(raster) | NodeKind::Background(raster) = &node.kind {
                    raster.composite_onto(&mut canvas);
                }
            }
        }
        canvas
    }

    fn check_injected_failure(&self) -> HostResult<()> {
        for id in self.visible_leaves() {
            if let Ok(node) = self.node(id) {
                if self.failing.contains(&node.name) {
                    return Err(HostError::Encode(format!("injected failure for '{}'", node.name)));
                }
            }
        }
        Ok(())
    }

    fn save_for_web(&mut self, options: &ActionDescriptor) -> HostResult<()> {
        let path = options.get_path("In  ").ok_or(HostError::MissingKey("In  "))?.to_path_buf();
        let (_, format) = options.get_enumerated("Fmt ").ok_or(HostError::MissingKey("Fmt "))?;
        let transparency = options.get_bool("Trns").ok_or(HostError::MissingKey("Trns"))?;
        let matte = RGB8::new(
            channel(options, "MttR")?,
            channel(options, "MttG")?,
            channel(options, "MttB")?,
        );
        if options.get_bool("Intr").unwrap_or(false) {
            log::debug!("interlaced output not supported, writing {} non-interlaced", path.display());
        }

        self.check_injected_failure()?;
        let image = self.composite();
        match format {
            "PN24" => writer::write_png24(&path, &image, transparency, matte),
            "PNG8" => {
                let reduction = match options.get_enumerated("RedA") {
                    Some((_, "Prcp" | "Sltv" | "Adpt")) => Reduction::Adaptive,
                    Some((_, "Web ")) => Reduction::Web,
                    Some((_, "FlBs")) => {
                        let name = options.get_string("FBPl").ok_or(HostError::MissingKey("FBPl"))?;
                        Reduction::Fixed(name.to_string())
                    }
                    Some((_, other)) => return Err(HostError::Unsupported(format!("colour reduction '{other}'"))),
                    None => return Err(HostError::MissingKey("RedA")),
                };
                let colors = options.get_integer("NCol").ok_or(HostError::MissingKey("NCol"))?;
                let dithering = match dither_kind(options, "Dthr")? {
                    DitherKind::None => 0.0,
                    DitherKind::Diffusion => f32::from(percentage(options, "DthA")?) / 100.0,
                    kind => {
                        log::debug!("{:?} dither rendered as diffusion", kind);
                        1.0
                    }
                };
                if transparency && dither_kind(options, "TDth")? != DitherKind::None {
                    percentage(options, "TDtA")?;
                    log::debug!("transparency dither rendered as a hard alpha cutoff");
                }
                let indexed = IndexedPng {
                    reduction,
                    colors: colors.clamp(2, 256) as usize,
                    dithering,
                    transparency,
                    matte,
                };
                writer::write_png8(&path, &image, &indexed)
            }
            other => Err(HostError::Unsupported(format!("save-for-web format '{other}'"))),
        }
    }

    fn matte_color(&self, matte: MatteType) -> Option<RGB8> {
        match matte {
            MatteType::White => Some(RGB8::new(255, 255, 255)),
            MatteType::Black => Some(RGB8::new(0, 0, 0)),
            MatteType::SemiGray => Some(RGB8::new(128, 128, 128)),
            MatteType::None => None,
            MatteType::Background => Some(self.background_color),
            MatteType::Foreground => Some(self.foreground_color),
        }
    }
}

fn channel(options: &ActionDescriptor, key: &'static str) -> HostResult<u8> {
    let value = options.get_integer(key).ok_or(HostError::MissingKey(key))?;
    Ok(value.clamp(0, 255) as u8)
}

fn percentage(options: &ActionDescriptor, key: &'static str) -> HostResult<u8> {
    let value = options.get_integer(key).ok_or(HostError::MissingKey(key))?;
    Ok(value.clamp(0, 100) as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DitherKind {
    None,
    Diffusion,
    Pattern,
    Noise,
}

fn dither_kind(options: &ActionDescriptor, key: &'static str) -> HostResult<DitherKind> {
    match options.get_enumerated(key) {
        Some((_, "None")) => Ok(DitherKind::None),
        Some((_, "Dfsn")) => Ok(DitherKind::Diffusion),
        Some((_, "Ptrn")) => Ok(DitherKind::Pattern),
        Some((_, "BNoi")) => Ok(DitherKind::Noise),
        Some((_, other)) => Err(HostError::Unsupported(format!("dither '{other}'"))),
        None => Err(HostError::MissingKey(key)),
    }
}

impl LayerHost for MemoryDocument {
    fn layer_count(&mut self) -> HostResult<usize> {
        self.stats.count_queries += 1;
        Ok(self.index_entries().len())
    }

    fn describe(&mut self, index: usize) -> HostResult<LayerDescriptor> {
        self.stats.describe_queries += 1;
        let (id, section) = self.entry(index)?;
        Ok(LayerDescriptor {
            visible: self.node(id)?.visible,
            section,
        })
    }

    fn background(&mut self) -> HostResult<Option<LayerHandle>> {
        self.background.map(|id| self.handle(id)).transpose()
    }

    fn active_index(&mut self) -> HostResult<Option<usize>> {
        let Some(active) = self.active else {
            return Ok(None);
        };
        if Some(active) == self.background {
            return Ok(Some(0));
        }
        Ok(self
            .index_entries()
            .iter()
            .position(|&(id, section)| id == active && section == LayerSection::Content)
            .map(|i| i + 1))
    }

    fn select(&mut self, index: usize) -> HostResult<()> {
        self.stats.selections += 1;
        if index == 0 {
            let bg = self.background.ok_or(HostError::IndexOutOfRange(0))?;
            self.active = Some(bg);
            return Ok(());
        }
        match self.entry(index)? {
            (id, LayerSection::Content) => {
                self.active = Some(id);
                Ok(())
            }
            _ => Err(HostError::NotSelectable(index)),
        }
    }

    fn clear_selection(&mut self) -> HostResult<()> {
        self.active = None;
        Ok(())
    }

    fn active_layer(&mut self) -> HostResult<LayerHandle> {
        let id = self.active.ok_or(HostError::NoActiveLayer)?;
        self.handle(id)
    }

    fn is_visible(&mut self, layer: LayerId) -> HostResult<bool> {
        Ok(self.node(layer)?.visible)
    }

    fn set_visible(&mut self, layer: LayerId, visible: bool) -> HostResult<()> {
        self.stats.visibility_writes += 1;
        self.node_mut(layer)?.visible = visible;
        // Showing a layer shows the groups holding it
        if visible {
            let mut current = layer;
            while let Some(parent) = self.parent_of(current) {
                self.node_mut(parent)?.visible = true;
                current = parent;
            }
        }
        Ok(())
    }

    fn capture_snapshot(&mut self) -> HostResult<SnapshotId> {
        self.stats.snapshots_captured += 1;
        let id = SnapshotId(Uuid::new_v4());
        let snapshot = Snapshot {
            visibility: self.nodes.iter().map(|n| n.visible).collect(),
            active: self.active,
        };
        self.snapshots.insert(id, snapshot);
        Ok(id)
    }

    fn apply_snapshot(&mut self, snapshot: SnapshotId) -> HostResult<()> {
        self.stats.snapshots_applied += 1;
        let state = self
            .snapshots
            .get(&snapshot)
            .cloned()
            .ok_or(HostError::UnknownSnapshot(snapshot))?;
        for (node, visible) in self.nodes.iter_mut().zip(state.visibility) {
            node.visible = visible;
        }
        self.active = state.active;
        Ok(())
    }

    fn discard_snapshot(&mut self, snapshot: SnapshotId) -> HostResult<()> {
        self.stats.snapshots_discarded += 1;
        self.snapshots
            .remove(&snapshot)
            .map(|_| ())
            .ok_or(HostError::UnknownSnapshot(snapshot))
    }

    fn execute_action(&mut self, event: &str, descriptor: &ActionDescriptor) -> HostResult<()> {
        if event != "Expr" {
            return Err(HostError::UnsupportedAction(event.to_string()));
        }
        let (class, options) = descriptor.get_object("Usng").ok_or(HostError::MissingKey("Usng"))?;
        if class != "SaveForWeb" {
            return Err(HostError::UnsupportedAction(format!("{event} using {class}")));
        }
        self.stats.encodes += 1;
        self.save_for_web(options)
    }

    fn save_as(
        &mut self,
        path: &Path,
        options: &SaveOptions,
        as_copy: bool,
        extension: ExtensionCase,
    ) -> HostResult<()> {
        self.stats.encodes += 1;
        let path = extension.apply(path);
        self.check_injected_failure()?;
        let image = self.composite();

        match options {
            SaveOptions::Jpeg(jpeg) => {
                if jpeg.embed_color_profile {
                    log::debug!("document has no colour profile to embed");
                }
                if jpeg.format_options == JpegFormatOptions::Progressive {
                    log::debug!("progressive JPEG not supported, writing baseline");
                }
                writer::write_jpeg(&path, &image, jpeg.quality, self.matte_color(jpeg.matte))?;
            }
            SaveOptions::Targa(targa) => {
                let bits = match targa.resolution {
                    TargaBitsPerPixel::Sixteen => 16,
                    TargaBitsPerPixel::TwentyFour => 24,
                    TargaBitsPerPixel::ThirtyTwo => 32,
                };
                writer::write_targa(&path, &image, bits, targa.alpha_channels, targa.rle_compression)?;
            }
        }

        if !as_copy {
            self.location = Some(path);
        }
        Ok(())
    }

    fn background_color(&mut self) -> HostResult<RGB8> {
        Ok(self.background_color)
    }

    fn foreground_color(&mut self) -> HostResult<RGB8> {
        Ok(self.foreground_color)
    }
}
