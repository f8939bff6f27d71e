//! Clip compilation: one `ClipSpec` onto one layer.

use clipforge_common::clock::secs_to_native;
use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_composition::{ClipSpec, PathResolver, SourceKind};
use clipforge_timeline::{
    AssetRequest, EditingBackend, NaturalSize, Placement, PropertyValue, TrackFilter, TrackKind,
};

/// Font description used for title clips that don't name one.
pub const DEFAULT_TITLE_FONT: &str = "serif 36";

/// Source-resolution settings shared by every clip of a composition.
#[derive(Debug, Clone, Copy)]
pub struct ClipContext<'a> {
    pub resolver: &'a PathResolver,
    pub absolute_paths: bool,
}

impl ClipContext<'_> {
    /// Asset request and track filter for a clip source.
    pub fn source_request(&self, source: &SourceKind) -> (AssetRequest, TrackFilter) {
        match source {
            SourceKind::SingleFile { src } => (
                AssetRequest::Uri(self.resolver.resolve(src, self.absolute_paths)),
                TrackFilter::All,
            ),
            SourceKind::ImageSequence { src } => (
                AssetRequest::ImageSequence(
                    self.resolver.resolve_sequence(src, self.absolute_paths),
                ),
                TrackFilter::VideoOnly,
            ),
            SourceKind::Title { .. } => (AssetRequest::Title, TrackFilter::All),
            SourceKind::Generated { .. } => (AssetRequest::TestPattern, TrackFilter::All),
        }
    }
}

/// Scaled frame size, or `None` when the natural size is unknown.
pub fn scaled_size(natural: NaturalSize, factor: f64) -> Option<(i32, i32)> {
    if !natural.is_known() {
        return None;
    }
    let width = (f64::from(natural.width) * factor).round() as i32;
    let height = (f64::from(natural.height) * factor).round() as i32;
    Some((width, height))
}

/// Convert a clip time field to native units.
fn native_time(field: &str, secs: u64) -> ClipforgeResult<u64> {
    secs_to_native(secs).ok_or_else(|| {
        ClipforgeError::schema(format!(
            "`{field}` of {secs}s is beyond the representable timeline"
        ))
    })
}

/// Timeline placement of a clip. The clip must also end within range.
pub fn clip_placement(spec: &ClipSpec) -> ClipforgeResult<Placement> {
    let placement = Placement {
        start: native_time("start", spec.start)?,
        inpoint: native_time("in", spec.inpoint)?,
        duration: native_time("dur", spec.duration)?,
    };
    if placement.start.checked_add(placement.duration).is_none() {
        return Err(ClipforgeError::schema(format!(
            "clip at {}s lasting {}s ends beyond the representable timeline",
            spec.start, spec.duration
        )));
    }
    Ok(placement)
}

/// Place a clip on `layer` and apply its overrides.
///
/// Asset resolution failures are returned as-is; the caller aborts the
/// whole compilation on any error.
pub fn compile_clip<B: EditingBackend>(
    backend: &mut B,
    layer: &B::Layer,
    spec: &ClipSpec,
    ctx: &ClipContext<'_>,
) -> ClipforgeResult<B::Clip> {
    let placement = clip_placement(spec)?;
    let (request, filter) = ctx.source_request(&spec.source);
    let asset = backend.request_asset(&request)?;

    let clip = backend.add_asset(layer, &asset, placement, filter)?;
    tracing::debug!(
        source = request.id(),
        start = placement.start,
        duration = placement.duration,
        overrides = spec.has_overrides(),
        "Clip placed"
    );

    let video = backend.find_track_element(&clip, TrackKind::Video);
    let audio = backend.find_track_element(&clip, TrackKind::Audio);

    match &spec.source {
        SourceKind::Title { text, font } => {
            if let Some(element) = &video {
                let font = font.as_deref().unwrap_or(DEFAULT_TITLE_FONT);
                backend.set_child_properties(
                    element,
                    &[("text", text.as_str().into()), ("font-desc", font.into())],
                )?;
            }
        }
        SourceKind::Generated { pattern } => backend.set_test_pattern(&clip, *pattern)?,
        SourceKind::SingleFile { .. } | SourceKind::ImageSequence { .. } => {}
    }

    if let (Some(element), Some(volume)) = (&audio, spec.volume) {
        backend.set_child_properties(element, &[("volume", volume.into())])?;
    }

    if let Some(element) = &video {
        let mut overrides: Vec<(&str, PropertyValue)> = Vec::new();
        if let Some(x) = spec.x {
            overrides.push(("posx", x.into()));
        }
        if let Some(y) = spec.y {
            overrides.push(("posy", y.into()));
        }
        if let Some(alpha) = spec.alpha {
            overrides.push(("alpha", alpha.into()));
        }
        if !overrides.is_empty() {
            backend.set_child_properties(element, &overrides)?;
        }

        if let Some(factor) = spec.size {
            match scaled_size(backend.natural_size(&asset), factor) {
                Some((width, height)) => backend.set_child_properties(
                    element,
                    &[("width", width.into()), ("height", height.into())],
                )?,
                None => tracing::debug!(
                    source = request.id(),
                    "Natural size unknown; size override skipped"
                ),
            }
        }
    }

    if let Some(effect) = spec.effect_name() {
        backend.add_effect(&clip, effect)?;
    }

    Ok(clip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_composition::TestPattern;
    use clipforge_timeline::{AssetCatalog, AssetInfo, MemoryTimeline};

    const IMAGE: &str = "file:///proj/data/a.png";
    const MOVIE: &str = "file:///proj/data/b.webm";

    fn resolver() -> PathResolver {
        PathResolver::new("/proj", "data")
    }

    fn timeline() -> MemoryTimeline {
        MemoryTimeline::new_audio_video(
            AssetCatalog::new()
                .with(IMAGE, AssetInfo::video(320, 240))
                .with(MOVIE, AssetInfo::audio_video(1280, 720))
                .with("multifile:///proj/data/png/%04d.png", AssetInfo::video(0, 0)),
        )
    }

    fn clip(source: SourceKind) -> ClipSpec {
        ClipSpec {
            source,
            start: 1,
            inpoint: 2,
            duration: 3,
            volume: None,
            x: None,
            y: None,
            alpha: None,
            size: None,
            effect: None,
        }
    }

    fn single(src: &str) -> SourceKind {
        SourceKind::SingleFile { src: src.into() }
    }

    fn compile(tl: &mut MemoryTimeline, spec: &ClipSpec) -> ClipforgeResult<usize> {
        let resolver = resolver();
        let ctx = ClipContext {
            resolver: &resolver,
            absolute_paths: false,
        };
        let layer = tl.append_layer(0, None)?;
        compile_clip(tl, &layer, spec, &ctx)?;
        Ok(tl.clips().len() - 1)
    }

    #[test]
    fn test_plain_placement_scales_times() {
        let mut tl = timeline();
        let index = compile(&mut tl, &clip(single("a.png"))).unwrap();
        let record = &tl.clips()[index];
        assert_eq!(record.asset_id, IMAGE);
        assert_eq!(
            (record.start, record.inpoint, record.duration),
            (1_000_000_000, 2_000_000_000, 3_000_000_000)
        );
        assert!(record.effects.is_empty());
        assert!(record.elements.iter().all(|e| e.properties.is_empty()));
    }

    #[test]
    fn test_video_and_audio_overrides() {
        let mut tl = timeline();
        let mut spec = clip(single("b.webm"));
        spec.volume = Some(0.25);
        spec.x = Some(-5);
        spec.y = Some(7);
        spec.alpha = Some(0.5);
        let index = compile(&mut tl, &spec).unwrap();
        let record = &tl.clips()[index];
        assert_eq!(record.property(TrackKind::Audio, "volume"), Some(&PropertyValue::Double(0.25)));
        assert_eq!(record.property(TrackKind::Video, "posx"), Some(&PropertyValue::Int(-5)));
        assert_eq!(record.property(TrackKind::Video, "posy"), Some(&PropertyValue::Int(7)));
        assert_eq!(record.property(TrackKind::Video, "alpha"), Some(&PropertyValue::Double(0.5)));
    }

    #[test]
    fn test_volume_without_audio_track_is_ignored() {
        let mut tl = timeline();
        let mut spec = clip(single("a.png"));
        spec.volume = Some(0.5);
        let index = compile(&mut tl, &spec).unwrap();
        assert!(tl.clips()[index].element(TrackKind::Audio).is_none());
    }

    #[test]
    fn test_size_uses_rounded_natural_dimensions() {
        let mut tl = timeline();
        let mut spec = clip(single("a.png"));
        spec.size = Some(0.333);
        let index = compile(&mut tl, &spec).unwrap();
        let record = &tl.clips()[index];
        assert_eq!(record.property(TrackKind::Video, "width"), Some(&PropertyValue::Int(107)));
        assert_eq!(record.property(TrackKind::Video, "height"), Some(&PropertyValue::Int(80)));
    }

    #[test]
    fn test_size_skipped_for_unknown_dimensions() {
        let mut tl = timeline();
        let mut spec = clip(SourceKind::ImageSequence {
            src: "png/%04d.png".into(),
        });
        spec.size = Some(2.0);
        let index = compile(&mut tl, &spec).unwrap();
        let record = &tl.clips()[index];
        assert_eq!(record.property(TrackKind::Video, "width"), None);
        assert_eq!(record.property(TrackKind::Video, "height"), None);
    }

    #[test]
    fn test_image_sequence_is_video_only() {
        let mut tl = timeline();
        let spec = clip(SourceKind::ImageSequence {
            src: "png/%04d.png".into(),
        });
        let index = compile(&mut tl, &spec).unwrap();
        let record = &tl.clips()[index];
        assert_eq!(record.asset_id, "multifile:///proj/data/png/%04d.png");
        assert_eq!(record.elements.len(), 1);
        assert_eq!(record.elements[0].track, TrackKind::Video);
    }

    #[test]
    fn test_effect_attached_once() {
        let mut tl = timeline();
        let mut spec = clip(single("a.png"));
        spec.effect = Some("agingtv".into());
        let index = compile(&mut tl, &spec).unwrap();
        assert_eq!(tl.clips()[index].effects, vec!["agingtv".to_string()]);

        spec.effect = Some(String::new());
        let index = compile(&mut tl, &spec).unwrap();
        assert!(tl.clips()[index].effects.is_empty());
    }

    #[test]
    fn test_title_clip_text_and_font() {
        let mut tl = timeline();
        let spec = clip(SourceKind::Title {
            text: "Hello".into(),
            font: None,
        });
        let index = compile(&mut tl, &spec).unwrap();
        let record = &tl.clips()[index];
        assert_eq!(record.type_name, "GESTitleClip");
        assert_eq!(record.property(TrackKind::Video, "text"), Some(&PropertyValue::from("Hello")));
        assert_eq!(
            record.property(TrackKind::Video, "font-desc"),
            Some(&PropertyValue::from(DEFAULT_TITLE_FONT))
        );
    }

    #[test]
    fn test_generated_clip_pattern() {
        let mut tl = timeline();
        let spec = clip(SourceKind::Generated {
            pattern: TestPattern::Snow,
        });
        let index = compile(&mut tl, &spec).unwrap();
        assert_eq!(tl.clips()[index].pattern, Some(TestPattern::Snow));
    }

    #[test]
    fn test_missing_asset_is_fatal() {
        let mut tl = timeline();
        let err = compile(&mut tl, &clip(single("missing.png"))).unwrap_err();
        assert!(matches!(err, ClipforgeError::AssetResolution { ref location, .. }
            if location == "file:///proj/data/missing.png"));
        assert!(tl.clips().is_empty());
    }

    #[test]
    fn test_absolute_paths_pass_through() {
        let resolver = resolver();
        let ctx = ClipContext {
            resolver: &resolver,
            absolute_paths: true,
        };
        let (request, filter) = ctx.source_request(&single("file:///srv/x.webm"));
        assert_eq!(request, AssetRequest::Uri("file:///srv/x.webm".into()));
        assert_eq!(filter, TrackFilter::All);
    }

    #[test]
    fn test_out_of_range_times_are_rejected_before_placement() {
        let mut tl = timeline();
        let mut spec = clip(single("a.png"));
        spec.start = 18_446_744_074;
        let err = compile(&mut tl, &spec).unwrap_err();
        assert!(matches!(err, ClipforgeError::Schema { .. }));
        assert!(err.to_string().contains("`start`"));
        assert!(tl.clips().is_empty());

        let mut spec = clip(single("a.png"));
        spec.start = 18_446_744_073;
        spec.duration = 1;
        assert!(matches!(
            compile(&mut tl, &spec).unwrap_err(),
            ClipforgeError::Schema { .. }
        ));
        assert!(tl.clips().is_empty());
    }

    #[test]
    fn test_scaled_size_rounds_half_away_from_zero() {
        assert_eq!(scaled_size(NaturalSize::new(3, 5), 0.5), Some((2, 3)));
        assert_eq!(scaled_size(NaturalSize::new(0, 5), 0.5), None);
    }
}
