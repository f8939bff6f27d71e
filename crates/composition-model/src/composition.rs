//! Composition, layer, and clip specifications.
//!
//! A composition document has a single root member `composition`:
//!
//! ```json
//! {"composition": {
//!     "name": "t", "width": 640, "height": 360, "fps": 25,
//!     "transparency": true, "absolute_paths": false,
//!     "layers": [{"autotransition": false, "clips": [
//!         {"src": "a.png", "start": 0, "in": 0, "dur": 2}
//!     ]}],
//!     "formats": ["mp4"]
//! }}
//! ```
//!
//! All time fields are whole seconds.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::document::{DocumentError, Node};

/// Root of a parsed composition document. Immutable after parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,

    /// When false, renders force an opaque pixel layout.
    pub transparency: bool,

    /// When true, clip sources and output names are used verbatim.
    pub absolute_paths: bool,

    /// Layers in stacking order.
    pub layers: Vec<LayerSpec>,

    /// Requested output format tags, in render order.
    pub formats: Vec<String>,
}

/// One layer of the composition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    /// Stacking priority, always the layer's index in the document.
    pub priority: u32,

    /// Auto-transition flag, `None` when the document leaves it unset.
    pub auto_transition: Option<bool>,

    pub clips: Vec<ClipSpec>,
}

/// One clip placement with optional property overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSpec {
    pub source: SourceKind,

    /// Timeline position, seconds.
    pub start: u64,

    /// Trim-in point within the source, seconds.
    pub inpoint: u64,

    /// Duration on the timeline, seconds.
    pub duration: u64,

    pub volume: Option<f64>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub alpha: Option<f64>,

    /// Scale factor applied to the asset's natural size.
    pub size: Option<f64>,

    /// Effect bin description; empty means none.
    pub effect: Option<String>,
}

/// What backs a clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// A single media file.
    SingleFile { src: String },

    /// A numbered image sequence such as `png/%04d.png`.
    ImageSequence { src: String },

    /// Generated text.
    Title { text: String, font: Option<String> },

    /// Generated test pattern.
    Generated { pattern: TestPattern },
}

impl SourceKind {
    /// Short label for logs.
    pub fn label(&self) -> &str {
        match self {
            Self::SingleFile { src } | Self::ImageSequence { src } => src,
            Self::Title { text, .. } => text,
            Self::Generated { pattern } => pattern.as_str(),
        }
    }
}

/// Test patterns available to generated sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestPattern {
    Smpte,
    Snow,
    Black,
    White,
    Red,
    Green,
    Blue,
}

impl TestPattern {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "smpte" => Some(Self::Smpte),
            "snow" => Some(Self::Snow),
            "black" => Some(Self::Black),
            "white" => Some(Self::White),
            "red" => Some(Self::Red),
            "green" => Some(Self::Green),
            "blue" => Some(Self::Blue),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Smpte => "smpte",
            Self::Snow => "snow",
            Self::Black => "black",
            Self::White => "white",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }
}

/// Errors that can occur when loading a composition.
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parsing error `{path}`: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Invalid composition: {message}")]
    ValidationError { message: String },
}

impl CompositionSpec {
    /// Read and parse a composition file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CompositionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CompositionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let value: Value =
            serde_json::from_str(&text).map_err(|e| CompositionError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::from_value(&value)
    }

    /// Build a composition from a parsed document root.
    pub fn from_value(root: &Value) -> Result<Self, CompositionError> {
        let comp = Node::root(root).member("composition")?;

        let name = comp.read_string("name")?.to_string();
        let width = positive(&comp, "width")?;
        let height = positive(&comp, "height")?;
        let fps = positive(&comp, "fps")?;

        let transparency = comp.try_get::<bool>("transparency")?.unwrap_or(true);
        let absolute_paths = comp.try_get::<bool>("absolute_paths")?.unwrap_or(false);

        let mut layers = Vec::new();
        for (index, layer) in comp.elements("layers")?.iter().enumerate() {
            let priority = u32::try_from(index).map_err(|_| CompositionError::ValidationError {
                message: format!("too many layers ({index})"),
            })?;
            layers.push(LayerSpec::from_node(&layer, priority)?);
        }

        let formats = comp
            .elements("formats")?
            .iter()
            .map(|node| node.as_scalar::<&str>().map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            width,
            height,
            fps,
            transparency,
            absolute_paths,
            layers,
            formats,
        })
    }

    /// Total number of clips across all layers.
    pub fn clip_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.clips.len()).sum()
    }
}

impl std::str::FromStr for CompositionSpec {
    type Err = CompositionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CompositionError::ParseError {
                path: PathBuf::from("<string>"),
                source: e,
            })?;
        Self::from_value(&value)
    }
}

impl LayerSpec {
    fn from_node(node: &Node<'_>, priority: u32) -> Result<Self, CompositionError> {
        let auto_transition = node.try_get::<bool>("autotransition")?;
        let clips = node
            .elements("clips")?
            .iter()
            .map(|clip| ClipSpec::from_node(&clip))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            priority,
            auto_transition,
            clips,
        })
    }
}

impl ClipSpec {
    fn from_node(node: &Node<'_>) -> Result<Self, CompositionError> {
        let source = source_kind(node)?;

        Ok(Self {
            source,
            start: seconds(node, "start")?,
            inpoint: seconds(node, "in")?,
            duration: seconds(node, "dur")?,
            volume: node.try_get::<f64>("volume")?,
            x: optional_i32(node, "x")?,
            y: optional_i32(node, "y")?,
            alpha: node.try_get::<f64>("alpha")?,
            size: node.try_get::<f64>("size")?,
            effect: node.try_get::<&str>("effect")?.map(str::to_string),
        })
    }

    /// The effect to attach, if any. Empty names attach nothing.
    pub fn effect_name(&self) -> Option<&str> {
        self.effect.as_deref().filter(|name| !name.is_empty())
    }

    /// Whether any property override is set.
    pub fn has_overrides(&self) -> bool {
        self.volume.is_some()
            || self.x.is_some()
            || self.y.is_some()
            || self.alpha.is_some()
            || self.size.is_some()
            || self.effect_name().is_some()
    }
}

fn source_kind(node: &Node<'_>) -> Result<SourceKind, CompositionError> {
    if node.try_get::<bool>("multi")?.unwrap_or(false) {
        return Ok(SourceKind::ImageSequence {
            src: node.read_string("src")?.to_string(),
        });
    }
    if let Some(text) = node.try_get::<&str>("text")? {
        return Ok(SourceKind::Title {
            text: text.to_string(),
            font: node.try_get::<&str>("font")?.map(str::to_string),
        });
    }
    if let Some(name) = node.try_get::<&str>("pattern")? {
        let pattern =
            TestPattern::from_name(name).ok_or_else(|| CompositionError::ValidationError {
                message: format!("unknown test pattern `{name}` in {}", node.path()),
            })?;
        return Ok(SourceKind::Generated { pattern });
    }
    Ok(SourceKind::SingleFile {
        src: node.read_string("src")?.to_string(),
    })
}

fn positive(node: &Node<'_>, field: &str) -> Result<u32, CompositionError> {
    let value = node.read_int(field)?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| CompositionError::ValidationError {
            message: format!("`{field}` in {} must be positive, got {value}", node.path()),
        })
}

fn seconds(node: &Node<'_>, field: &str) -> Result<u64, CompositionError> {
    let value = node.read_int(field)?;
    u64::try_from(value).map_err(|_| CompositionError::ValidationError {
        message: format!(
            "`{field}` in {} must not be negative, got {value}",
            node.path()
        ),
    })
}

fn optional_i32(node: &Node<'_>, field: &str) -> Result<Option<i32>, CompositionError> {
    node.try_get::<i64>(field)?
        .map(|value| {
            i32::try_from(value).map_err(|_| CompositionError::ValidationError {
                message: format!("`{field}` in {} is out of range: {value}", node.path()),
            })
        })
        .transpose()
}
