//! GStreamer Editing Services timeline.

use std::sync::OnceLock;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_composition::{ProjectLocation, TestPattern};
use ges::prelude::*;
use gst::glib;
use gstreamer as gst;
use gstreamer_editing_services as ges;

use crate::backend::{
    AssetRequest, EditingBackend, NaturalSize, Placement, PropertyValue, TrackFilter, TrackKind,
};

/// Initialize GStreamer and GES once per process.
pub fn init_ges() -> ClipforgeResult<()> {
    static GES_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GES_INIT.get_or_init(|| {
        gst::init().map_err(|e| e.to_string())?;
        ges::init().map_err(|e| e.to_string())
    });
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(ClipforgeError::timeline(format!(
            "Failed to initialize GStreamer Editing Services: {e}"
        ))),
    }
}

/// Audio+video GES timeline.
pub struct GesTimeline {
    timeline: ges::Timeline,
}

impl GesTimeline {
    pub fn new_audio_video() -> ClipforgeResult<Self> {
        init_ges()?;
        Ok(Self {
            timeline: ges::Timeline::new_audio_video(),
        })
    }

    /// Underlying GES timeline, for building a pipeline around it.
    pub fn timeline(&self) -> &ges::Timeline {
        &self.timeline
    }
}

fn track_type(kind: TrackKind) -> ges::TrackType {
    match kind {
        TrackKind::Audio => ges::TrackType::AUDIO,
        TrackKind::Video => ges::TrackType::VIDEO,
    }
}

fn filter_types(filter: TrackFilter) -> ges::TrackType {
    match filter {
        TrackFilter::All => ges::TrackType::UNKNOWN,
        TrackFilter::VideoOnly => ges::TrackType::VIDEO,
    }
}

fn video_pattern(pattern: TestPattern) -> ges::VideoTestPattern {
    match pattern {
        TestPattern::Smpte => ges::VideoTestPattern::Smpte,
        TestPattern::Snow => ges::VideoTestPattern::Snow,
        TestPattern::Black => ges::VideoTestPattern::Black,
        TestPattern::White => ges::VideoTestPattern::White,
        TestPattern::Red => ges::VideoTestPattern::Red,
        TestPattern::Green => ges::VideoTestPattern::Green,
        TestPattern::Blue => ges::VideoTestPattern::Blue,
    }
}

fn to_value(value: &PropertyValue) -> glib::Value {
    match value {
        PropertyValue::Int(v) => v.to_value(),
        PropertyValue::Double(v) => v.to_value(),
        PropertyValue::Str(v) => v.to_value(),
    }
}

impl EditingBackend for GesTimeline {
    type Asset = ges::Asset;
    type Layer = ges::Layer;
    type Clip = ges::Clip;
    type Element = ges::TrackElement;

    fn name(&self) -> &str {
        "ges"
    }

    fn request_asset(&mut self, request: &AssetRequest) -> ClipforgeResult<ges::Asset> {
        match request {
            AssetRequest::Uri(uri) | AssetRequest::ImageSequence(uri) => {
                ges::UriClipAsset::request_sync(uri)
                    .map(|asset| asset.upcast::<ges::Asset>())
                    .map_err(|e| ClipforgeError::asset(uri.as_str(), e.to_string()))
            }
            AssetRequest::Title => generated_asset(ges::TitleClip::static_type(), request),
            AssetRequest::TestPattern => generated_asset(ges::TestClip::static_type(), request),
        }
    }

    fn natural_size(&self, asset: &ges::Asset) -> NaturalSize {
        let Some(uri_asset) = asset.downcast_ref::<ges::UriClipAsset>() else {
            return NaturalSize::default();
        };
        uri_asset
            .info()
            .video_streams()
            .first()
            .map(|stream| NaturalSize::new(stream.width(), stream.height()))
            .unwrap_or_default()
    }

    fn append_layer(
        &mut self,
        priority: u32,
        auto_transition: Option<bool>,
    ) -> ClipforgeResult<ges::Layer> {
        let layer = ges::Layer::new();
        layer.set_property("priority", priority);
        if let Some(auto) = auto_transition {
            layer.set_auto_transition(auto);
        }
        self.timeline
            .add_layer(&layer)
            .map_err(|e| ClipforgeError::timeline(format!("Failed to add layer {priority}: {e}")))?;
        Ok(layer)
    }

    fn add_asset(
        &mut self,
        layer: &ges::Layer,
        asset: &ges::Asset,
        placement: Placement,
        filter: TrackFilter,
    ) -> ClipforgeResult<ges::Clip> {
        layer
            .add_asset(
                asset,
                gst::ClockTime::from_nseconds(placement.start),
                gst::ClockTime::from_nseconds(placement.inpoint),
                gst::ClockTime::from_nseconds(placement.duration),
                filter_types(filter),
            )
            .map_err(|e| {
                ClipforgeError::timeline(format!("Failed to add {} to layer: {e}", asset.id()))
            })
    }

    fn find_track_element(&self, clip: &ges::Clip, track: TrackKind) -> Option<ges::TrackElement> {
        let wanted = track_type(track);
        clip.children(false)
            .into_iter()
            .filter_map(|child| child.downcast::<ges::TrackElement>().ok())
            .filter(|element| !element.is::<ges::BaseEffect>())
            .find(|element| element.track_type() == wanted)
    }

    fn set_child_properties(
        &mut self,
        element: &ges::TrackElement,
        properties: &[(&str, PropertyValue)],
    ) -> ClipforgeResult<()> {
        for (name, value) in properties {
            element
                .set_child_property(name, &to_value(value))
                .map_err(|e| {
                    ClipforgeError::timeline(format!("Failed to set child property {name}: {e}"))
                })?;
        }
        Ok(())
    }

    fn add_effect(&mut self, clip: &ges::Clip, description: &str) -> ClipforgeResult<()> {
        let effect = ges::Effect::new(description).map_err(|e| {
            ClipforgeError::timeline(format!("Failed to create effect {description}: {e}"))
        })?;
        clip.add(&effect).map_err(|e| {
            ClipforgeError::timeline(format!("Failed to attach effect {description}: {e}"))
        })
    }

    fn set_test_pattern(&mut self, clip: &ges::Clip, pattern: TestPattern) -> ClipforgeResult<()> {
        let test_clip = clip
            .downcast_ref::<ges::TestClip>()
            .ok_or_else(|| ClipforgeError::timeline("clip is not a test-pattern clip"))?;
        test_clip.set_vpattern(video_pattern(pattern));
        Ok(())
    }

    fn commit(&mut self) -> ClipforgeResult<()> {
        let changed = self.timeline.commit_sync();
        tracing::debug!(changed, "Timeline committed");
        Ok(())
    }

    fn duration(&self) -> u64 {
        self.timeline.duration().nseconds()
    }

    fn save(&self, location: &ProjectLocation) -> ClipforgeResult<()> {
        self.timeline
            .save_to_uri(&location.uri, None::<&ges::Asset>, true)
            .map_err(|e| ClipforgeError::persistence(location.uri.as_str(), e.to_string()))?;
        tracing::debug!(uri = %location.uri, "Project saved");
        Ok(())
    }
}

fn generated_asset(
    extractable: glib::Type,
    request: &AssetRequest,
) -> ClipforgeResult<ges::Asset> {
    ges::Asset::request(extractable, None)
        .map_err(|e| ClipforgeError::asset(request.id(), e.to_string()))?
        .ok_or_else(|| ClipforgeError::asset(request.id(), "asset factory returned nothing"))
}
