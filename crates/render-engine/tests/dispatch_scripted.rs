use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_composition::{CompositionSpec, OutputFormat, PathResolver};
use clipforge_render_engine::{
    PassOutcome, PassProgress, PassReport, PassRequest, PassStatus, PlannedPass,
    RenderBackend, RenderDispatcher, RenderObserver, RestrictionCaps,
};

/// Backend that replays a script of pass results.
#[derive(Default)]
struct ScriptedBackend {
    results: VecDeque<ClipforgeResult<PassOutcome>>,
    restrictions: Vec<String>,
    requests: Vec<PassRequest>,
    duration: u64,
}

impl ScriptedBackend {
    fn new(results: Vec<ClipforgeResult<PassOutcome>>) -> Self {
        Self {
            results: results.into(),
            duration: 2_000_000_000,
            ..Default::default()
        }
    }
}

impl RenderBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply_restriction(&mut self, caps: &RestrictionCaps) -> ClipforgeResult<()> {
        self.restrictions.push(caps.to_string());
        Ok(())
    }

    fn duration(&self) -> u64 {
        self.duration
    }

    fn run_pass(
        &mut self,
        request: &PassRequest,
        on_progress: &mut dyn FnMut(PassProgress),
    ) -> ClipforgeResult<PassOutcome> {
        self.requests.push(request.clone());
        on_progress(PassProgress::new(self.duration / 2, self.duration));
        self.results.pop_front().unwrap_or(Ok(PassOutcome::Eos))
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Vec<String>,
}

impl RenderObserver for RecordingObserver {
    fn pass_started(&mut self, pass: &PlannedPass) {
        self.events.push(format!("start {}", pass.tag));
    }

    fn progress(&mut self, progress: &PassProgress) {
        self.events.push(progress.status_line());
    }

    fn pass_finished(&mut self, report: &PassReport) {
        let word = if report.status.is_success() { "Rendering" } else { "Error" };
        self.events.push(format!("{word} {}", report.tag));
    }
}

fn scratch(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("clipforge_dispatch_{test}"));
    std::fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

fn fixture_spec() -> CompositionSpec {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("compositions")
        .join("single-clip.json");
    CompositionSpec::load(path).expect("fixture should parse")
}

fn dispatcher(dir: &PathBuf) -> RenderDispatcher {
    RenderDispatcher::new(
        PathResolver::new(dir, "data"),
        "export",
        Duration::from_millis(100),
    )
}

#[test]
fn single_mp4_pass_targets_export_dir() {
    let dir = scratch("single");
    let spec = fixture_spec();
    let mut backend = ScriptedBackend::new(vec![Ok(PassOutcome::Eos)]);
    let mut observer = RecordingObserver::default();

    let summary = dispatcher(&dir)
        .run(&mut backend, &spec, &mut observer)
        .expect("dispatch should run");

    assert!(summary.all_succeeded());
    assert_eq!(summary.passes.len(), 1);
    assert!(dir.join("data").join("export").is_dir());

    let sink = backend.requests[0].sink.as_ref().expect("render pass has a sink");
    assert!(sink.location.starts_with("file://"));
    assert!(sink.location.ends_with("/data/export/t.mp4"));
    assert_eq!(sink.profile.container, "video/quicktime,variant=iso");
    assert_eq!(sink.profile.video, "video/x-h264");
    assert_eq!(sink.profile.audio, "audio/mpeg,mpegversion=4");
    assert_eq!(
        observer.events,
        vec!["start mp4", "50.00% 1.00/2.00s", "Rendering mp4"]
    );
}

#[test]
fn unknown_format_renders_like_mp4() {
    let dir = scratch("avi");
    let mut spec = fixture_spec();
    spec.formats = vec!["avi".into(), "mp4".into()];
    let mut backend = ScriptedBackend::new(Vec::new());

    let summary = dispatcher(&dir)
        .run(&mut backend, &spec, &mut RecordingObserver::default())
        .expect("dispatch should run");

    assert_eq!(summary.passes[0].format, OutputFormat::Mp4);
    assert_eq!(backend.requests[0].sink, backend.requests[1].sink);
    assert!(summary.passes[0].output.ends_with("export/t.mp4"));
}

#[test]
fn opaque_composition_restricts_every_pass_to_i420() {
    let dir = scratch("opaque");
    let mut spec = fixture_spec();
    spec.transparency = false;
    spec.formats = vec!["mp4".into(), "webm".into(), "ogg".into()];
    let mut backend = ScriptedBackend::new(Vec::new());

    dispatcher(&dir)
        .run(&mut backend, &spec, &mut RecordingObserver::default())
        .expect("dispatch should run");

    assert_eq!(
        backend.restrictions,
        vec!["video/x-raw,width=640,height=360,framerate=25/1,format=I420"]
    );
    assert_eq!(backend.requests.len(), 3);
    for request in &backend.requests {
        let profile = &request.sink.as_ref().expect("sink").profile;
        assert!(profile.video_restriction.ends_with(",format=I420"));
    }
}

#[test]
fn failed_pass_does_not_stop_the_batch() {
    let dir = scratch("failure");
    let mut spec = fixture_spec();
    spec.formats = vec!["mp4".into(), "webm".into(), "mkv".into()];
    let mut backend = ScriptedBackend::new(vec![
        Ok(PassOutcome::Eos),
        Err(ClipforgeError::render("vp8enc0: could not encode")),
        Ok(PassOutcome::Eos),
    ]);
    let mut observer = RecordingObserver::default();

    let summary = dispatcher(&dir)
        .run(&mut backend, &spec, &mut observer)
        .expect("dispatch should run");

    assert_eq!(summary.passes.len(), 3);
    assert!(!summary.all_succeeded());
    assert!(matches!(
        &summary.passes[1].status,
        PassStatus::Failed { message } if message.contains("vp8enc0")
    ));
    assert!(summary.passes[2].status.is_success());
    assert!(observer.events.contains(&"Error webm".to_string()));
    assert_eq!(observer.events.last().map(String::as_str), Some("Rendering mkv"));
}

#[test]
fn repeated_dispatch_uses_identical_profiles() {
    let dir = scratch("idempotent");
    let spec = fixture_spec();
    let d = dispatcher(&dir);

    let mut first = ScriptedBackend::new(Vec::new());
    let mut second = ScriptedBackend::new(Vec::new());
    d.run(&mut first, &spec, &mut RecordingObserver::default())
        .expect("first run");
    d.run(&mut second, &spec, &mut RecordingObserver::default())
        .expect("second run");

    assert_eq!(first.requests, second.requests);
}

#[test]
fn preview_runs_without_sink() {
    let dir = scratch("preview");
    let spec = fixture_spec();
    let mut backend = ScriptedBackend::new(vec![Ok(PassOutcome::PreviewElapsed)]);

    let outcome = dispatcher(&dir)
        .preview(&mut backend, &spec, &mut RecordingObserver::default())
        .expect("preview should run");

    assert_eq!(outcome, PassOutcome::PreviewElapsed);
    assert!(backend.requests[0].sink.is_none());
    assert_eq!(backend.restrictions.len(), 1);
}

#[test]
fn preview_of_empty_timeline_is_rejected() {
    let dir = scratch("preview_empty");
    let spec = fixture_spec();
    let mut backend = ScriptedBackend::new(Vec::new());
    backend.duration = 0;

    assert!(dispatcher(&dir)
        .preview(&mut backend, &spec, &mut RecordingObserver::default())
        .is_err());
    assert!(backend.requests.is_empty());
}
