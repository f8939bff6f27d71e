//! Restriction caps and encoding-profile descriptions.

use std::fmt;

use clipforge_composition::{CompositionSpec, OutputFormat};
use serde::Serialize;

/// Pixel format forced when a composition disables transparency.
pub const OPAQUE_PIXEL_FORMAT: &str = "I420";

/// Restriction applied to the audio stream of every profile.
pub const AUDIO_RESTRICTION: &str = "audio/x-raw";

/// Forced resolution, framerate, and pixel layout of the video track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestrictionCaps {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pixel_format: Option<String>,
}

impl RestrictionCaps {
    pub fn for_composition(spec: &CompositionSpec) -> Self {
        Self {
            width: spec.width,
            height: spec.height,
            fps: spec.fps,
            pixel_format: (!spec.transparency).then(|| OPAQUE_PIXEL_FORMAT.to_string()),
        }
    }
}

impl fmt::Display for RestrictionCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "video/x-raw,width={},height={},framerate={}/1",
            self.width, self.height, self.fps
        )?;
        if let Some(format) = &self.pixel_format {
            write!(f, ",format={format}")?;
        }
        Ok(())
    }
}

/// Container profile with one video and one audio stream profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingProfileDesc {
    pub name: String,
    pub description: String,
    pub container: &'static str,
    pub video: &'static str,
    pub audio: &'static str,
    pub video_restriction: String,
    pub audio_restriction: &'static str,
}

impl EncodingProfileDesc {
    pub fn new(format: OutputFormat, restriction: &RestrictionCaps) -> Self {
        let entry = format.entry();
        Self {
            name: "Profile".to_string(),
            description: "A web video profile".to_string(),
            container: entry.container,
            video: entry.video,
            audio: entry.audio,
            video_restriction: restriction.to_string(),
            audio_restriction: AUDIO_RESTRICTION,
        }
    }
}

/// Output settings for one requested format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: OutputFormat,
    pub pixel_format: Option<String>,
}

impl RenderProfile {
    /// Profile for a format tag. Unknown tags select the default format.
    pub fn for_tag(spec: &CompositionSpec, tag: &str) -> Self {
        let restriction = RestrictionCaps::for_composition(spec);
        Self {
            width: restriction.width,
            height: restriction.height,
            fps: restriction.fps,
            format: OutputFormat::from_tag(tag),
            pixel_format: restriction.pixel_format,
        }
    }

    pub fn restriction(&self) -> RestrictionCaps {
        RestrictionCaps {
            width: self.width,
            height: self.height,
            fps: self.fps,
            pixel_format: self.pixel_format.clone(),
        }
    }

    pub fn encoding_profile(&self) -> EncodingProfileDesc {
        EncodingProfileDesc::new(self.format, &self.restriction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(transparency: bool) -> CompositionSpec {
        CompositionSpec {
            name: "t".into(),
            width: 640,
            height: 360,
            fps: 25,
            transparency,
            absolute_paths: false,
            layers: Vec::new(),
            formats: vec!["mp4".into()],
        }
    }

    #[test]
    fn test_restriction_caps_string() {
        assert_eq!(
            RestrictionCaps::for_composition(&spec(true)).to_string(),
            "video/x-raw,width=640,height=360,framerate=25/1"
        );
        assert_eq!(
            RestrictionCaps::for_composition(&spec(false)).to_string(),
            "video/x-raw,width=640,height=360,framerate=25/1,format=I420"
        );
    }

    #[test]
    fn test_mp4_encoding_profile() {
        let profile = RenderProfile::for_tag(&spec(true), "mp4").encoding_profile();
        assert_eq!(profile.name, "Profile");
        assert_eq!(profile.container, "video/quicktime,variant=iso");
        assert_eq!(profile.video, "video/x-h264");
        assert_eq!(profile.audio, "audio/mpeg,mpegversion=4");
        assert_eq!(profile.audio_restriction, "audio/x-raw");
        assert_eq!(
            profile.video_restriction,
            "video/x-raw,width=640,height=360,framerate=25/1"
        );
    }

    #[test]
    fn test_unknown_tag_profile_matches_mp4() {
        let s = spec(false);
        assert_eq!(
            RenderProfile::for_tag(&s, "avi").encoding_profile(),
            RenderProfile::for_tag(&s, "mp4").encoding_profile()
        );
    }
}
