//! The editing-backend seam.
//!
//! The compiler drives a non-linear editing object model through this trait
//! only: request an asset, add a layer, place an asset on a layer, look up a
//! clip's per-track element and set its child properties, attach effects,
//! commit and save. Handles are opaque associated types so each backend can
//! use its native object references.

use clipforge_common::ClipforgeResult;
use clipforge_composition::{ProjectLocation, TestPattern};
use serde::Serialize;

/// Kind of a timeline track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    /// Track-type flag value used in xges project files.
    pub fn xges_flag(self) -> u32 {
        match self {
            Self::Audio => 2,
            Self::Video => 4,
        }
    }
}

/// Which tracks an added asset should produce elements in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackFilter {
    /// Every track the asset supports.
    All,
    /// Only the video track.
    VideoOnly,
}

impl TrackFilter {
    pub fn admits(self, kind: TrackKind) -> bool {
        match self {
            Self::All => true,
            Self::VideoOnly => kind == TrackKind::Video,
        }
    }
}

/// What to request from the asset factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRequest {
    /// A single media file at a resolved locator.
    Uri(String),
    /// A numbered image sequence at a `multifile://` locator.
    ImageSequence(String),
    /// A generated text source.
    Title,
    /// A generated test-pattern source.
    TestPattern,
}

impl AssetRequest {
    /// Identifier used for logs and error reports.
    pub fn id(&self) -> &str {
        match self {
            Self::Uri(uri) | Self::ImageSequence(uri) => uri,
            Self::Title => "title",
            Self::TestPattern => "test-pattern",
        }
    }
}

/// Natural frame size reported by an asset. `0x0` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

impl NaturalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Clip placement in native time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub start: u64,
    pub inpoint: u64,
    pub duration: u64,
}

/// Value assigned to a track-element child property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i32),
    Double(f64),
    Str(String),
}

impl PropertyValue {
    /// Render as a GstStructure field value (`(int)10`, `(double)0.5`, ...).
    pub fn to_structure_field(&self) -> String {
        match self {
            Self::Int(v) => format!("(int){v}"),
            Self::Double(v) => format!("(double){v}"),
            Self::Str(v) => format!("(string)\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")),
        }
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// Operations the compiler needs from a non-linear editing timeline.
pub trait EditingBackend {
    type Asset;
    type Layer;
    type Clip;
    type Element;

    /// Backend name.
    fn name(&self) -> &str;

    /// Synchronously resolve an asset. Fails if the source is missing or
    /// cannot be decoded.
    fn request_asset(&mut self, request: &AssetRequest) -> ClipforgeResult<Self::Asset>;

    /// Natural frame size of an asset.
    fn natural_size(&self, asset: &Self::Asset) -> NaturalSize;

    /// Create a layer with the given stacking priority and register it.
    fn append_layer(
        &mut self,
        priority: u32,
        auto_transition: Option<bool>,
    ) -> ClipforgeResult<Self::Layer>;

    /// Place an asset on a layer, yielding a clip with one element per
    /// admitted track.
    fn add_asset(
        &mut self,
        layer: &Self::Layer,
        asset: &Self::Asset,
        placement: Placement,
        filter: TrackFilter,
    ) -> ClipforgeResult<Self::Clip>;

    /// The clip's element in the given track, if it has one.
    fn find_track_element(&self, clip: &Self::Clip, track: TrackKind) -> Option<Self::Element>;

    /// Assign several child properties as one update.
    fn set_child_properties(
        &mut self,
        element: &Self::Element,
        properties: &[(&str, PropertyValue)],
    ) -> ClipforgeResult<()>;

    /// Instantiate a named effect and attach it to the clip.
    fn add_effect(&mut self, clip: &Self::Clip, description: &str) -> ClipforgeResult<()>;

    /// Select the pattern of a generated test-pattern clip.
    fn set_test_pattern(&mut self, clip: &Self::Clip, pattern: TestPattern)
        -> ClipforgeResult<()>;

    /// Finalize pending edits.
    fn commit(&mut self) -> ClipforgeResult<()>;

    /// Timeline duration in native units.
    fn duration(&self) -> u64;

    /// Persist the timeline as a project file.
    fn save(&self, location: &ProjectLocation) -> ClipforgeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_only_filter() {
        assert!(TrackFilter::VideoOnly.admits(TrackKind::Video));
        assert!(!TrackFilter::VideoOnly.admits(TrackKind::Audio));
        assert!(TrackFilter::All.admits(TrackKind::Audio));
    }

    #[test]
    fn test_structure_field_rendering() {
        assert_eq!(PropertyValue::Int(-4).to_structure_field(), "(int)-4");
        assert_eq!(PropertyValue::Double(0.5).to_structure_field(), "(double)0.5");
        assert_eq!(
            PropertyValue::from("say \"hi\"").to_structure_field(),
            "(string)\"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn test_unknown_natural_size() {
        assert!(!NaturalSize::default().is_known());
        assert!(!NaturalSize::new(640, 0).is_known());
        assert!(NaturalSize::new(640, 360).is_known());
    }
}
