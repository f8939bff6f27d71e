//! Clipforge Render Engine
//!
//! Drives one render pass per requested output format over a committed
//! timeline.
//!
//! # Pass Flow
//!
//! ```text
//! composition ──► restriction caps ──► video track (once)
//!      │
//!      └── formats ──► encoding profile ──► output location
//!                               │
//!                               ▼
//!                  RenderSession: Idle ► Playing ► Eos/Error ► Null
//!                               │
//!                               ▼
//!                        PassReport ──► RenderSummary
//! ```

pub mod backend;
pub mod dispatch;
#[cfg(feature = "ges")]
pub mod ges_pipeline;
pub mod profile;
pub mod session;

pub use backend::*;
pub use dispatch::*;
#[cfg(feature = "ges")]
pub use ges_pipeline::GesRenderBackend;
pub use profile::*;
pub use session::*;
