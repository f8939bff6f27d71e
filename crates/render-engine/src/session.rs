//! Per-pass render session.
//!
//! A session owns everything one render pass needs to track: the target
//! duration, the pass state, the first error reported on the bus, and the
//! progress throttle. Backends feed it bus events and position samples from
//! their polling loop.

use std::time::Duration;

use clipforge_common::clock::native_to_secs;
use clipforge_common::{ClipforgeError, ClipforgeResult, RateController};
use serde::Serialize;

/// Lifecycle of one pass: `Idle -> Playing -> {Eos | Error} -> Null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Playing,
    Eos,
    Error,
    Null,
}

/// Whether the pass encodes to a sink or only plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionMode {
    Render,
    Preview,
}

/// Pipeline bus message, reduced to what the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Eos,
    Error {
        source: String,
        message: String,
        debug: Option<String>,
    },
    Other,
}

/// Error captured from the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassFailure {
    pub source: String,
    pub message: String,
    pub debug: Option<String>,
}

/// Progress sample of a running pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassProgress {
    /// Current position, native units.
    pub position: u64,
    /// Target duration, native units.
    pub duration: u64,
    pub percent: f64,
}

impl PassProgress {
    pub fn new(position: u64, duration: u64) -> Self {
        let percent = if duration == 0 {
            0.0
        } else {
            position as f64 / duration as f64 * 100.0
        };
        Self {
            position,
            duration,
            percent,
        }
    }

    /// `12.50% 1.25/10.00s`
    pub fn status_line(&self) -> String {
        format!(
            "{:.2}% {:.2}/{:.2}s",
            self.percent,
            native_to_secs(self.position),
            native_to_secs(self.duration)
        )
    }
}

/// How a successful pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassOutcome {
    /// The pipeline reached end of stream.
    Eos,
    /// A preview ran for the full timeline duration.
    PreviewElapsed,
}

#[derive(Debug)]
pub struct RenderSession {
    mode: SessionMode,
    duration: u64,
    state: SessionState,
    failure: Option<PassFailure>,
    preview_done: bool,
    throttle: RateController,
}

impl RenderSession {
    pub fn new(mode: SessionMode, duration: u64, poll_interval: Duration) -> Self {
        Self {
            mode,
            duration,
            state: SessionState::Idle,
            failure: None,
            preview_done: false,
            throttle: RateController::every(poll_interval),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn failure(&self) -> Option<&PassFailure> {
        self.failure.as_ref()
    }

    /// Enter `Playing`. Only valid from `Idle`.
    pub fn start(&mut self) -> ClipforgeResult<()> {
        if self.state != SessionState::Idle {
            return Err(ClipforgeError::render(format!(
                "cannot start a pass in state {:?}",
                self.state
            )));
        }
        self.state = SessionState::Playing;
        Ok(())
    }

    /// Whether the polling loop should stop.
    pub fn is_finished(&self) -> bool {
        self.state != SessionState::Playing
    }

    /// React to a bus message. The first terminal message wins.
    pub fn handle_bus(&mut self, event: BusEvent) {
        if self.state != SessionState::Playing {
            return;
        }
        match event {
            BusEvent::Eos => self.state = SessionState::Eos,
            BusEvent::Error {
                source,
                message,
                debug,
            } => {
                let debug_detail = &debug;
                tracing::warn!(%source, %message, debug = ?debug_detail, "Render pass error");
                self.failure = Some(PassFailure {
                    source,
                    message,
                    debug,
                });
                self.state = SessionState::Error;
            }
            BusEvent::Other => {}
        }
    }

    /// Record a position sample; returns a progress report when one is due.
    ///
    /// Reports are throttled to the poll interval of wall-clock time and
    /// suppressed while the position is still zero.
    pub fn sample(&mut self, position: u64, elapsed: Duration) -> Option<PassProgress> {
        if self.state != SessionState::Playing || position == 0 {
            return None;
        }
        let elapsed_ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.throttle
            .should_tick(elapsed_ns)
            .then(|| PassProgress::new(position, self.duration))
    }

    /// End a preview once it has played for the timeline duration.
    /// Returns true if the preview was stopped.
    pub fn check_preview_deadline(&mut self, elapsed: Duration) -> bool {
        let elapsed_ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        if self.mode == SessionMode::Preview
            && self.state == SessionState::Playing
            && elapsed_ns >= self.duration
        {
            self.preview_done = true;
            self.state = SessionState::Eos;
            return true;
        }
        false
    }

    /// Move to `Null` and report how the pass ended.
    pub fn teardown(&mut self) -> ClipforgeResult<PassOutcome> {
        let ended = self.state;
        self.state = SessionState::Null;
        match ended {
            SessionState::Eos if self.preview_done => Ok(PassOutcome::PreviewElapsed),
            SessionState::Eos => Ok(PassOutcome::Eos),
            SessionState::Error => {
                let message = self
                    .failure
                    .as_ref()
                    .map(|f| format!("{}: {}", f.source, f.message))
                    .unwrap_or_else(|| "pipeline error".to_string());
                Err(ClipforgeError::render(message))
            }
            SessionState::Idle | SessionState::Playing | SessionState::Null => Err(
                ClipforgeError::render(format!("pass stopped in state {ended:?} before EOS")),
            ),
        }
    }
}
