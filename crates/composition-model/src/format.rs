//! Output format tags and their container/codec lookup table.

use serde::{Deserialize, Serialize};

/// Container/codec family selected by a `formats` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Theora video, Vorbis audio, Ogg container.
    Ogg,
    /// VP8 video, Vorbis audio, WebM container.
    Webm,
    /// H.264 video, AAC audio, ISO MP4 container.
    Mp4,
    /// H.264 video, Vorbis audio, Matroska container.
    Mkv,
}

/// One row of the encoding lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatEntry {
    /// Container caps description.
    pub container: &'static str,
    /// Audio codec caps description.
    pub audio: &'static str,
    /// Video codec caps description.
    pub video: &'static str,
    /// Output file extension.
    pub extension: &'static str,
}

const OGG: FormatEntry = FormatEntry {
    container: "application/ogg",
    audio: "audio/x-vorbis",
    video: "video/x-theora",
    extension: "ogv",
};

const WEBM: FormatEntry = FormatEntry {
    container: "video/webm",
    audio: "audio/x-vorbis",
    video: "video/x-vp8",
    extension: "webm",
};

const MP4: FormatEntry = FormatEntry {
    container: "video/quicktime,variant=iso",
    audio: "audio/mpeg,mpegversion=4",
    video: "video/x-h264",
    extension: "mp4",
};

const MKV: FormatEntry = FormatEntry {
    container: "video/x-matroska",
    audio: "audio/x-vorbis",
    video: "video/x-h264",
    extension: "mkv",
};

impl OutputFormat {
    /// Format used for unrecognised tags.
    pub const DEFAULT: OutputFormat = OutputFormat::Mp4;

    /// Map a format tag to a format. Unknown tags fall back to
    /// [`OutputFormat::DEFAULT`]; this is not an error.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ogg" => Self::Ogg,
            "webm" => Self::Webm,
            "mp4" => Self::Mp4,
            "mkv" => Self::Mkv,
            _ => Self::DEFAULT,
        }
    }

    /// Whether `tag` names a format explicitly (rather than via fallback).
    pub fn is_known_tag(tag: &str) -> bool {
        matches!(tag, "ogg" | "webm" | "mp4" | "mkv")
    }

    pub fn entry(self) -> &'static FormatEntry {
        match self {
            Self::Ogg => &OGG,
            Self::Webm => &WEBM,
            Self::Mp4 => &MP4,
            Self::Mkv => &MKV,
        }
    }

    pub fn extension(self) -> &'static str {
        self.entry().extension
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ogg => "ogg",
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
        }
    }
}
