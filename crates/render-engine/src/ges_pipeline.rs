//! GES pipeline render backend.

use std::str::FromStr;

use clipforge_common::{ClipforgeError, ClipforgeResult, Stopwatch};
use ges::prelude::*;
use gstreamer as gst;
use gstreamer_editing_services as ges;
use gstreamer_pbutils as gst_pbutils;

use crate::backend::{PassRequest, RenderBackend};
use crate::profile::{EncodingProfileDesc, RestrictionCaps};
use crate::session::{BusEvent, PassOutcome, PassProgress, RenderSession, SessionMode};

/// Renders a committed GES timeline, one `ges::Pipeline` per pass.
pub struct GesRenderBackend {
    timeline: ges::Timeline,
}

impl GesRenderBackend {
    /// The timeline must come from an initialized GES runtime.
    pub fn new(timeline: &ges::Timeline) -> Self {
        Self {
            timeline: timeline.clone(),
        }
    }

    fn video_track(&self) -> Option<ges::Track> {
        self.timeline
            .tracks()
            .into_iter()
            .find(|track| track.track_type() == ges::TrackType::VIDEO)
    }
}

fn caps(description: &str) -> ClipforgeResult<gst::Caps> {
    gst::Caps::from_str(description)
        .map_err(|e| ClipforgeError::render(format!("Invalid caps `{description}`: {e}")))
}

fn encoding_profile(desc: &EncodingProfileDesc) -> ClipforgeResult<gst_pbutils::EncodingContainerProfile> {
    let video = gst_pbutils::EncodingVideoProfile::builder(&caps(desc.video)?)
        .restriction(&caps(&desc.video_restriction)?)
        .presence(0)
        .build();
    let audio = gst_pbutils::EncodingAudioProfile::builder(&caps(desc.audio)?)
        .restriction(&caps(desc.audio_restriction)?)
        .presence(0)
        .build();
    Ok(
        gst_pbutils::EncodingContainerProfile::builder(&caps(desc.container)?)
            .name(&desc.name)
            .description(&desc.description)
            .add_profile(video)
            .add_profile(audio)
            .build(),
    )
}

fn bus_event(msg: &gst::Message) -> BusEvent {
    match msg.view() {
        gst::MessageView::Eos(_) => BusEvent::Eos,
        gst::MessageView::Error(err) => BusEvent::Error {
            source: msg
                .src()
                .map(|src| src.path_string().to_string())
                .unwrap_or_else(|| "pipeline".to_string()),
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        },
        _ => BusEvent::Other,
    }
}

impl RenderBackend for GesRenderBackend {
    fn name(&self) -> &str {
        "ges"
    }

    fn is_available(&self) -> bool {
        gst::ElementFactory::find("encodebin").is_some()
    }

    fn apply_restriction(&mut self, restriction: &RestrictionCaps) -> ClipforgeResult<()> {
        let track = self
            .video_track()
            .ok_or_else(|| ClipforgeError::render("Timeline has no video track"))?;
        track.set_restriction_caps(&caps(&restriction.to_string())?);
        Ok(())
    }

    fn duration(&self) -> u64 {
        self.timeline.duration().nseconds()
    }

    fn run_pass(
        &mut self,
        request: &PassRequest,
        on_progress: &mut dyn FnMut(PassProgress),
    ) -> ClipforgeResult<PassOutcome> {
        let pipeline = ges::Pipeline::new();
        pipeline
            .set_timeline(&self.timeline)
            .map_err(|e| ClipforgeError::render(format!("Failed to attach timeline: {e}")))?;

        let mode = match &request.sink {
            Some(sink) => {
                let profile = encoding_profile(&sink.profile)?;
                pipeline
                    .set_render_settings(&sink.location, &profile)
                    .map_err(|e| {
                        ClipforgeError::render(format!(
                            "Failed to set render sink {}: {e}",
                            sink.location
                        ))
                    })?;
                pipeline
                    .set_mode(ges::PipelineFlags::RENDER)
                    .map_err(|e| ClipforgeError::render(format!("Failed to enter render mode: {e}")))?;
                SessionMode::Render
            }
            None => {
                pipeline
                    .set_mode(ges::PipelineFlags::FULL_PREVIEW)
                    .map_err(|e| ClipforgeError::render(format!("Failed to enter preview mode: {e}")))?;
                SessionMode::Preview
            }
        };

        let bus = pipeline
            .bus()
            .ok_or_else(|| ClipforgeError::render("Pipeline has no bus"))?;
        let mut session = RenderSession::new(mode, self.duration(), request.poll_interval);
        session.start()?;

        if let Err(e) = pipeline.set_state(gst::State::Playing) {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(ClipforgeError::render(format!(
                "Failed to start pipeline: {e:?}"
            )));
        }

        let poll = gst::ClockTime::from_nseconds(
            u64::try_from(request.poll_interval.as_nanos()).unwrap_or(u64::MAX),
        );
        let watch = Stopwatch::start();
        while !session.is_finished() {
            if let Some(msg) = bus.timed_pop(poll) {
                session.handle_bus(bus_event(&msg));
            }
            if session.check_preview_deadline(watch.elapsed()) {
                tracing::debug!("Preview reached timeline duration");
            }
            if let Some(position) = pipeline.query_position::<gst::ClockTime>() {
                if let Some(progress) = session.sample(position.nseconds(), watch.elapsed()) {
                    on_progress(progress);
                }
            }
        }

        pipeline.set_state(gst::State::Null).map_err(|e| {
            ClipforgeError::render(format!("Failed to stop pipeline: {e:?}"))
        })?;
        session.teardown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_composition::OutputFormat;
    use gst_pbutils::prelude::*;

    fn opaque_mp4() -> EncodingProfileDesc {
        let restriction = RestrictionCaps {
            width: 640,
            height: 360,
            fps: 25,
            pixel_format: Some("I420".to_string()),
        };
        EncodingProfileDesc::new(OutputFormat::Mp4, &restriction)
    }

    #[test]
    fn test_mp4_profile_carries_codecs_and_restrictions() {
        gst::init().unwrap();
        let profile = encoding_profile(&opaque_mp4()).unwrap();
        assert_eq!(profile.name().as_deref(), Some("Profile"));
        assert!(profile
            .format()
            .is_equal(&caps("video/quicktime,variant=iso").unwrap()));

        let streams = profile.profiles();
        assert_eq!(streams.len(), 2);

        let video = streams
            .iter()
            .find(|p| p.is::<gst_pbutils::EncodingVideoProfile>())
            .unwrap();
        assert!(video.format().is_equal(&caps("video/x-h264").unwrap()));
        let restriction = video.restriction().unwrap();
        let fields = restriction.structure(0).unwrap();
        assert_eq!(fields.name(), "video/x-raw");
        assert_eq!(fields.get::<&str>("format").unwrap(), "I420");
        assert_eq!(fields.get::<i32>("width").unwrap(), 640);
        assert_eq!(fields.get::<i32>("height").unwrap(), 360);

        let audio = streams
            .iter()
            .find(|p| p.is::<gst_pbutils::EncodingAudioProfile>())
            .unwrap();
        assert!(audio
            .format()
            .is_equal(&caps("audio/mpeg,mpegversion=4").unwrap()));
        assert!(audio
            .restriction()
            .unwrap()
            .is_equal(&caps("audio/x-raw").unwrap()));
    }

    #[test]
    fn test_invalid_caps_are_a_render_error() {
        gst::init().unwrap();
        let err = caps("not caps at all,,").unwrap_err();
        assert!(matches!(err, ClipforgeError::Render { .. }));
    }

    #[test]
    fn test_bus_messages_map_to_session_events() {
        gst::init().unwrap();
        assert_eq!(bus_event(&gst::message::Eos::new()), BusEvent::Eos);
        assert_eq!(bus_event(&gst::message::Latency::new()), BusEvent::Other);

        let msg = gst::message::Error::builder(gst::CoreError::Failed, "encoder failed")
            .debug("x264 gave up")
            .build();
        match bus_event(&msg) {
            BusEvent::Error {
                source,
                message,
                debug,
            } => {
                assert_eq!(source, "pipeline");
                assert_eq!(message, "encoder failed");
                assert_eq!(debug.as_deref(), Some("x264 gave up"));
            }
            other => panic!("expected an error event, got {other:?}"),
        }
    }
}
