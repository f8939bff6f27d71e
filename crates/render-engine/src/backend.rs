//! Render backend seam.

use std::time::Duration;

use clipforge_common::{ClipforgeError, ClipforgeResult};

use crate::profile::{EncodingProfileDesc, RestrictionCaps};
use crate::session::{PassOutcome, PassProgress};

/// Where and how a pass encodes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSink {
    pub location: String,
    pub profile: EncodingProfileDesc,
}

/// One pass to run. Without a sink the timeline is previewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRequest {
    pub sink: Option<RenderSink>,
    pub poll_interval: Duration,
}

/// Trait for render backends.
pub trait RenderBackend {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check if this backend can run passes on this system.
    fn is_available(&self) -> bool;

    /// Restrict the video track's format. Applies to every later pass.
    fn apply_restriction(&mut self, caps: &RestrictionCaps) -> ClipforgeResult<()>;

    /// Timeline duration in native units.
    fn duration(&self) -> u64;

    /// Run one pass to completion, blocking the caller.
    fn run_pass(
        &mut self,
        request: &PassRequest,
        on_progress: &mut dyn FnMut(PassProgress),
    ) -> ClipforgeResult<PassOutcome>;
}

/// Stand-in used when no media runtime is compiled in. Every pass fails.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
    duration: u64,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>, duration: u64) -> Self {
        Self {
            reason: reason.into(),
            duration,
        }
    }
}

impl RenderBackend for UnavailableBackend {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn apply_restriction(&mut self, _caps: &RestrictionCaps) -> ClipforgeResult<()> {
        Ok(())
    }

    fn duration(&self) -> u64 {
        self.duration
    }

    fn run_pass(
        &mut self,
        _request: &PassRequest,
        _on_progress: &mut dyn FnMut(PassProgress),
    ) -> ClipforgeResult<PassOutcome> {
        Err(ClipforgeError::unsupported(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_backend_fails_every_pass() {
        let mut backend = UnavailableBackend::new("built without the ges feature", 5);
        assert!(!backend.is_available());
        assert_eq!(backend.duration(), 5);
        let request = PassRequest {
            sink: None,
            poll_interval: Duration::from_millis(100),
        };
        let err = backend.run_pass(&request, &mut |_| {}).unwrap_err();
        assert!(matches!(err, ClipforgeError::Unsupported { .. }));
    }
}
