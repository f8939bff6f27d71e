//! In-memory editing timeline.
//!
//! Used for dry runs, builds without a media runtime, and tests. Assets are
//! resolved against an [`AssetCatalog`]; the timeline records layers, clips,
//! per-track element properties and effects, and saves itself as xges XML.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_composition::{ProjectLocation, TestPattern};
use serde::Serialize;

use crate::backend::{
    AssetRequest, EditingBackend, NaturalSize, Placement, PropertyValue, TrackFilter, TrackKind,
};
use crate::xges::{self, XgesAsset, XgesClip, XgesLayer, XgesProject, XgesSource, XgesTrack};

const STILL_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff"];

/// Stream layout and frame size of a known asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub size: NaturalSize,
    pub has_video: bool,
    pub has_audio: bool,
}

impl AssetInfo {
    /// Video-only source such as a still image.
    pub fn video(width: u32, height: u32) -> Self {
        Self {
            size: NaturalSize::new(width, height),
            has_video: true,
            has_audio: false,
        }
    }

    /// Source carrying both video and audio streams.
    pub fn audio_video(width: u32, height: u32) -> Self {
        Self {
            size: NaturalSize::new(width, height),
            has_video: true,
            has_audio: true,
        }
    }

    pub fn audio_only() -> Self {
        Self {
            size: NaturalSize::default(),
            has_video: false,
            has_audio: true,
        }
    }
}

/// How locators missing from the catalog are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownAssets {
    /// Fail the request.
    Reject,
    /// Accept `file://` and `multifile://` locators that exist on disk, with
    /// unknown frame size.
    ProbeFiles,
}

/// Registry of the assets an in-memory timeline can resolve.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    entries: BTreeMap<String, AssetInfo>,
    unknown: UnknownAssets,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCatalog {
    /// Empty catalog that rejects anything not registered.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            unknown: UnknownAssets::Reject,
        }
    }

    /// Empty catalog that falls back to checking the filesystem.
    pub fn probing_files() -> Self {
        Self {
            entries: BTreeMap::new(),
            unknown: UnknownAssets::ProbeFiles,
        }
    }

    pub fn with(mut self, locator: impl Into<String>, info: AssetInfo) -> Self {
        self.insert(locator, info);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, info: AssetInfo) {
        self.entries.insert(locator.into(), info);
    }

    fn lookup(&self, request: &AssetRequest) -> ClipforgeResult<AssetInfo> {
        match request {
            AssetRequest::Title => Ok(AssetInfo::video(0, 0)),
            AssetRequest::TestPattern => Ok(AssetInfo::audio_video(0, 0)),
            AssetRequest::Uri(locator) | AssetRequest::ImageSequence(locator) => {
                if let Some(info) = self.entries.get(locator) {
                    return Ok(*info);
                }
                match self.unknown {
                    UnknownAssets::Reject => Err(ClipforgeError::asset(
                        locator.as_str(),
                        "asset is not registered",
                    )),
                    UnknownAssets::ProbeFiles => probe(request, locator),
                }
            }
        }
    }
}

fn probe(request: &AssetRequest, locator: &str) -> ClipforgeResult<AssetInfo> {
    let path = locator
        .strip_prefix("multifile://")
        .or_else(|| locator.strip_prefix("file://"))
        .map(PathBuf::from)
        .ok_or_else(|| ClipforgeError::asset(locator, "only local file locators can be probed"))?;

    match request {
        AssetRequest::ImageSequence(_) => {
            let dir = path.parent().unwrap_or(&path);
            if !dir.is_dir() {
                return Err(ClipforgeError::asset(locator, "sequence directory not found"));
            }
            Ok(AssetInfo::video(0, 0))
        }
        _ => {
            if !path.is_file() {
                return Err(ClipforgeError::asset(locator, "no such file"));
            }
            let still = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| STILL_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if still {
                Ok(AssetInfo::video(0, 0))
            } else {
                Ok(AssetInfo::audio_video(0, 0))
            }
        }
    }
}

/// Resolved asset handle.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAsset {
    pub id: String,
    pub type_name: &'static str,
    pub info: AssetInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    clip: ClipId,
    track: TrackKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerRecord {
    pub priority: u32,
    pub auto_transition: bool,
    pub clips: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRecord {
    pub track: TrackKind,
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipRecord {
    pub layer: usize,
    pub asset_id: String,
    pub type_name: &'static str,
    pub start: u64,
    pub inpoint: u64,
    pub duration: u64,
    pub elements: Vec<ElementRecord>,
    pub effects: Vec<String>,
    pub pattern: Option<TestPattern>,
}

impl ClipRecord {
    pub fn element(&self, track: TrackKind) -> Option<&ElementRecord> {
        self.elements.iter().find(|element| element.track == track)
    }

    /// Child property of the element in `track`.
    pub fn property(&self, track: TrackKind, name: &str) -> Option<&PropertyValue> {
        self.element(track)?.properties.get(name)
    }
}

/// Audio+video timeline kept entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryTimeline {
    catalog: AssetCatalog,
    tracks: Vec<TrackKind>,
    layers: Vec<LayerRecord>,
    clips: Vec<ClipRecord>,
    committed: bool,
}

impl MemoryTimeline {
    /// Timeline with one video track followed by one audio track.
    pub fn new_audio_video(catalog: AssetCatalog) -> Self {
        Self {
            catalog,
            tracks: vec![TrackKind::Video, TrackKind::Audio],
            layers: Vec::new(),
            clips: Vec::new(),
            committed: false,
        }
    }

    pub fn tracks(&self) -> &[TrackKind] {
        &self.tracks
    }

    pub fn layers(&self) -> &[LayerRecord] {
        &self.layers
    }

    pub fn clips(&self) -> &[ClipRecord] {
        &self.clips
    }

    /// Clips on a layer, in insertion order.
    pub fn layer_clips(&self, layer: usize) -> impl Iterator<Item = &ClipRecord> {
        self.layers
            .get(layer)
            .map(|record| record.clips.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|index| self.clips.get(*index))
    }

    pub fn clip(&self, id: ClipId) -> Option<&ClipRecord> {
        self.clips.get(id.0)
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    fn clip_mut(&mut self, id: ClipId) -> ClipforgeResult<&mut ClipRecord> {
        self.clips
            .get_mut(id.0)
            .ok_or_else(|| ClipforgeError::timeline(format!("no clip with id {}", id.0)))
    }

    fn track_id(&self, kind: TrackKind) -> u32 {
        self.tracks
            .iter()
            .position(|track| *track == kind)
            .and_then(|index| u32::try_from(index).ok())
            .unwrap_or_default()
    }

    /// Describe the timeline in project-file form.
    pub fn to_project(&self) -> XgesProject {
        let mut assets: Vec<XgesAsset> = Vec::new();
        for clip in &self.clips {
            if !assets.iter().any(|asset| asset.id == clip.asset_id) {
                assets.push(XgesAsset {
                    id: clip.asset_id.clone(),
                    extractable_type: clip.type_name.to_string(),
                });
            }
        }

        let tracks = self
            .tracks
            .iter()
            .map(|kind| XgesTrack {
                track_id: self.track_id(*kind),
                track_type: kind.xges_flag(),
                caps: match kind {
                    TrackKind::Video => "video/x-raw(ANY)".to_string(),
                    TrackKind::Audio => "audio/x-raw(ANY)".to_string(),
                },
            })
            .collect();

        let layers = self
            .layers
            .iter()
            .map(|layer| XgesLayer {
                priority: layer.priority,
                auto_transition: layer.auto_transition,
                clips: layer
                    .clips
                    .iter()
                    .filter_map(|index| Some((*index, self.clips.get(*index)?)))
                    .map(|(index, clip)| self.xges_clip(index, clip))
                    .collect(),
            })
            .collect();

        XgesProject {
            metadatas: Some(format!(
                "metadatas, date=(string)\"{}\";",
                chrono::Utc::now().to_rfc3339()
            )),
            assets,
            tracks,
            layers,
        }
    }

    fn xges_clip(&self, index: usize, clip: &ClipRecord) -> XgesClip {
        let sources = clip
            .elements
            .iter()
            .map(|element| XgesSource {
                track_id: self.track_id(element.track),
                children_properties: children_properties(&element.properties),
            })
            .collect();
        XgesClip {
            id: u32::try_from(index).unwrap_or(u32::MAX),
            asset_id: clip.asset_id.clone(),
            type_name: clip.type_name.to_string(),
            track_types: clip.elements.iter().map(|e| e.track.xges_flag()).sum(),
            start: clip.start,
            inpoint: clip.inpoint,
            duration: clip.duration,
            sources,
            effects: clip.effects.clone(),
        }
    }
}

fn children_properties(properties: &BTreeMap<String, PropertyValue>) -> String {
    if properties.is_empty() {
        return "properties;".to_string();
    }
    let fields: Vec<String> = properties
        .iter()
        .map(|(name, value)| format!("{name}={}", value.to_structure_field()))
        .collect();
    format!("properties, {};", fields.join(", "))
}

impl EditingBackend for MemoryTimeline {
    type Asset = MemoryAsset;
    type Layer = LayerId;
    type Clip = ClipId;
    type Element = ElementId;

    fn name(&self) -> &str {
        "memory"
    }

    fn request_asset(&mut self, request: &AssetRequest) -> ClipforgeResult<MemoryAsset> {
        let info = self.catalog.lookup(request)?;
        let type_name = match request {
            AssetRequest::Uri(_) | AssetRequest::ImageSequence(_) => "GESUriClip",
            AssetRequest::Title => "GESTitleClip",
            AssetRequest::TestPattern => "GESTestClip",
        };
        Ok(MemoryAsset {
            id: request.id().to_string(),
            type_name,
            info,
        })
    }

    fn natural_size(&self, asset: &MemoryAsset) -> NaturalSize {
        asset.info.size
    }

    fn append_layer(
        &mut self,
        priority: u32,
        auto_transition: Option<bool>,
    ) -> ClipforgeResult<LayerId> {
        self.layers.push(LayerRecord {
            priority,
            auto_transition: auto_transition.unwrap_or(false),
            clips: Vec::new(),
        });
        self.committed = false;
        Ok(LayerId(self.layers.len() - 1))
    }

    fn add_asset(
        &mut self,
        layer: &LayerId,
        asset: &MemoryAsset,
        placement: Placement,
        filter: TrackFilter,
    ) -> ClipforgeResult<ClipId> {
        if layer.0 >= self.layers.len() {
            return Err(ClipforgeError::timeline(format!(
                "layer {} is not part of the timeline",
                layer.0
            )));
        }

        let elements: Vec<ElementRecord> = self
            .tracks
            .iter()
            .copied()
            .filter(|kind| filter.admits(*kind))
            .filter(|kind| match kind {
                TrackKind::Video => asset.info.has_video,
                TrackKind::Audio => asset.info.has_audio,
            })
            .map(|track| ElementRecord {
                track,
                properties: BTreeMap::new(),
            })
            .collect();
        if elements.is_empty() {
            return Err(ClipforgeError::timeline(format!(
                "asset {} has no stream for the requested tracks",
                asset.id
            )));
        }

        let id = ClipId(self.clips.len());
        self.clips.push(ClipRecord {
            layer: layer.0,
            asset_id: asset.id.clone(),
            type_name: asset.type_name,
            start: placement.start,
            inpoint: placement.inpoint,
            duration: placement.duration,
            elements,
            effects: Vec::new(),
            pattern: None,
        });
        self.layers[layer.0].clips.push(id.0);
        self.committed = false;
        Ok(id)
    }

    fn find_track_element(&self, clip: &ClipId, track: TrackKind) -> Option<ElementId> {
        self.clip(*clip)?.element(track).map(|_| ElementId {
            clip: *clip,
            track,
        })
    }

    fn set_child_properties(
        &mut self,
        element: &ElementId,
        properties: &[(&str, PropertyValue)],
    ) -> ClipforgeResult<()> {
        let record = self
            .clip_mut(element.clip)?
            .elements
            .iter_mut()
            .find(|e| e.track == element.track)
            .ok_or_else(|| ClipforgeError::timeline("clip has no element in that track"))?;
        for (name, value) in properties {
            record.properties.insert((*name).to_string(), value.clone());
        }
        Ok(())
    }

    fn add_effect(&mut self, clip: &ClipId, description: &str) -> ClipforgeResult<()> {
        if description.trim().is_empty() {
            return Err(ClipforgeError::timeline("empty effect description"));
        }
        self.clip_mut(*clip)?.effects.push(description.to_string());
        Ok(())
    }

    fn set_test_pattern(&mut self, clip: &ClipId, pattern: TestPattern) -> ClipforgeResult<()> {
        let record = self.clip_mut(*clip)?;
        if record.type_name != "GESTestClip" {
            return Err(ClipforgeError::timeline(format!(
                "clip {} is not a test-pattern clip",
                record.asset_id
            )));
        }
        record.pattern = Some(pattern);
        Ok(())
    }

    fn commit(&mut self) -> ClipforgeResult<()> {
        self.committed = true;
        Ok(())
    }

    fn duration(&self) -> u64 {
        self.clips
            .iter()
            .map(|clip| clip.start.saturating_add(clip.duration))
            .max()
            .unwrap_or(0)
    }

    fn save(&self, location: &ProjectLocation) -> ClipforgeResult<()> {
        let xml = xges::write_project(&self.to_project())
            .map_err(|e| ClipforgeError::persistence(location.uri.as_str(), e.to_string()))?;
        std::fs::write(&location.path, xml)
            .map_err(|e| ClipforgeError::persistence(location.uri.as_str(), e.to_string()))?;
        tracing::debug!(uri = %location.uri, "Project saved");
        Ok(())
    }
}
