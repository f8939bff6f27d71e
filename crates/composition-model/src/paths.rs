//! Media location resolution.
//!
//! Relative clip sources are resolved against `<working dir>/<media dir>/`
//! and expressed as `file://` locators. When a composition enables absolute
//! paths, sources are passed through untouched. No existence check happens
//! here; a missing file surfaces later when the asset is requested.

use std::path::{Path, PathBuf};

/// Marker prefixed to a resolved location to request an image-sequence
/// source. Prefixed to a `file://` locator it yields `multifile://`.
pub const SEQUENCE_MARKER: &str = "multi";

/// Resolves media references relative to a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    /// Directory the project is run from.
    base_dir: PathBuf,

    /// Project-relative media subfolder (e.g. `data`).
    media_dir: String,
}

impl PathResolver {
    pub fn new(base_dir: impl Into<PathBuf>, media_dir: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            media_dir: media_dir.into(),
        }
    }

    /// Resolver rooted at the process's current working directory.
    pub fn from_current_dir(media_dir: impl Into<String>) -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?, media_dir))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Filesystem directory holding project media.
    pub fn media_root(&self) -> PathBuf {
        self.base_dir.join(&self.media_dir)
    }

    /// `file://` locator of the media directory, with a trailing slash.
    pub fn media_root_uri(&self) -> String {
        format!("{}/", file_uri(&self.media_root()))
    }

    /// Resolve a clip source to an addressable location.
    pub fn resolve(&self, raw: &str, absolute_paths: bool) -> String {
        if absolute_paths {
            raw.to_string()
        } else {
            format!("{}{raw}", self.media_root_uri())
        }
    }

    /// Resolve an image-sequence pattern and mark it as a sequence source.
    pub fn resolve_sequence(&self, raw: &str, absolute_paths: bool) -> String {
        format!("{SEQUENCE_MARKER}{}", self.resolve(raw, absolute_paths))
    }

    /// Filesystem directory render outputs are written to.
    pub fn export_root(&self, export_dir: &str) -> PathBuf {
        self.media_root().join(export_dir)
    }

    /// Location of a render output named `<name>.<extension>`.
    pub fn export_location(&self, export_dir: &str, name: &str, extension: &str) -> String {
        format!(
            "{}{export_dir}/{name}.{extension}",
            self.media_root_uri()
        )
    }

    /// Where the project file for `input` is persisted.
    ///
    /// Absolute inputs persist beside themselves; relative inputs resolve
    /// against the base directory.
    pub fn project_location(&self, input: &Path) -> ProjectLocation {
        let resolved = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.base_dir.join(input)
        };
        let mut file_name = resolved.as_os_str().to_owned();
        file_name.push(".xges");
        let path = PathBuf::from(file_name);
        ProjectLocation {
            uri: file_uri(&path),
            path,
        }
    }
}

/// Filesystem path and locator of a persisted project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLocation {
    pub path: PathBuf,
    pub uri: String,
}

/// Build a `file://` locator for an absolute filesystem path.
///
/// Backslashes are normalised to forward slashes and drive-letter paths get
/// the extra leading slash (`file:///C:/...`).
pub fn file_uri(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}
