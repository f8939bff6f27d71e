//! Composition compilation: document to committed, persisted timeline.

use std::path::{Path, PathBuf};

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_composition::{CompositionError, CompositionSpec, PathResolver, ProjectLocation};
use clipforge_timeline::EditingBackend;
use serde::Serialize;

use crate::clip::ClipContext;
use crate::layer::compile_layer;

/// Result of compiling and persisting one composition.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledComposition {
    pub spec: CompositionSpec,

    /// Where the project file was written.
    pub project: PathBuf,
    pub project_uri: String,

    /// Timeline duration in native units.
    pub duration: u64,
}

/// Map a composition loading error onto the workspace error type.
pub fn composition_error(path: &Path, err: CompositionError) -> ClipforgeError {
    match err {
        CompositionError::IoError { source, .. } => ClipforgeError::parse(path, source.to_string()),
        CompositionError::ParseError { source, .. } => {
            ClipforgeError::parse(path, source.to_string())
        }
        CompositionError::Document(e) => ClipforgeError::schema(e.to_string()),
        CompositionError::ValidationError { message } => ClipforgeError::schema(message),
    }
}

/// Read and validate a composition file.
pub fn load_composition(path: &Path) -> ClipforgeResult<CompositionSpec> {
    CompositionSpec::load(path).map_err(|e| composition_error(path, e))
}

/// Compile every layer of `spec` onto `backend` and commit.
pub fn compile_timeline<B: EditingBackend>(
    backend: &mut B,
    spec: &CompositionSpec,
    resolver: &PathResolver,
) -> ClipforgeResult<()> {
    let ctx = ClipContext {
        resolver,
        absolute_paths: spec.absolute_paths,
    };
    for layer in &spec.layers {
        compile_layer(backend, layer, &ctx)?;
    }
    backend.commit()?;
    tracing::info!(
        composition = %spec.name,
        backend = backend.name(),
        layers = spec.layers.len(),
        clips = spec.clip_count(),
        "Timeline compiled"
    );
    Ok(())
}

/// Load `input`, compile it onto `backend`, and save the project file
/// beside the input.
///
/// Nothing is persisted unless every layer and clip compiled.
pub fn compile_file<B: EditingBackend>(
    backend: &mut B,
    input: &Path,
    resolver: &PathResolver,
) -> ClipforgeResult<CompiledComposition> {
    let spec = load_composition(input)?;
    compile_timeline(backend, &spec, resolver)?;

    let ProjectLocation { path, uri } = resolver.project_location(input);
    backend.save(&ProjectLocation {
        path: path.clone(),
        uri: uri.clone(),
    })?;
    tracing::info!(project = %uri, "Project saved");

    Ok(CompiledComposition {
        duration: backend.duration(),
        spec,
        project: path,
        project_uri: uri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_timeline::{AssetCatalog, AssetInfo, MemoryTimeline};

    #[test]
    fn test_commit_after_layers() {
        let spec: CompositionSpec = r#"{"composition": {
            "name": "t", "width": 640, "height": 360, "fps": 25,
            "layers": [
                {"clips": [{"src": "a.png", "start": 0, "in": 0, "dur": 2}]},
                {"autotransition": true, "clips": []}
            ],
            "formats": ["mp4"]
        }}"#
        .parse()
        .unwrap();
        let resolver = PathResolver::new("/w", "data");
        let mut tl = MemoryTimeline::new_audio_video(
            AssetCatalog::new().with("file:///w/data/a.png", AssetInfo::video(640, 360)),
        );
        compile_timeline(&mut tl, &spec, &resolver).unwrap();

        assert!(tl.is_committed());
        let priorities: Vec<u32> = tl.layers().iter().map(|l| l.priority).collect();
        assert_eq!(priorities, vec![0, 1]);
        assert_eq!(tl.duration(), 2_000_000_000);
    }

    #[test]
    fn test_failed_compile_leaves_timeline_uncommitted() {
        let spec: CompositionSpec = r#"{"composition": {
            "name": "t", "width": 1, "height": 1, "fps": 1,
            "layers": [{"clips": [{"src": "gone.png", "start": 0, "in": 0, "dur": 1}]}],
            "formats": []
        }}"#
        .parse()
        .unwrap();
        let resolver = PathResolver::new("/w", "data");
        let mut tl = MemoryTimeline::new_audio_video(AssetCatalog::new());
        let err = compile_timeline(&mut tl, &spec, &resolver).unwrap_err();
        assert!(err.is_compile_phase());
        assert!(!tl.is_committed());
    }

    #[test]
    fn test_error_mapping() {
        let path = Path::new("bad.json");
        let err = "not json".parse::<CompositionSpec>().unwrap_err();
        assert!(matches!(
            composition_error(path, err),
            ClipforgeError::Parse { .. }
        ));

        let err = r#"{"composition": {"name": "t"}}"#
            .parse::<CompositionSpec>()
            .unwrap_err();
        let mapped = composition_error(path, err);
        assert!(matches!(mapped, ClipforgeError::Schema { .. }));
        assert!(mapped.to_string().contains("width"));
    }
}
