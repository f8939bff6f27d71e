//! Clipforge Timeline
//!
//! The seam between the composition compiler and a non-linear editing
//! object model:
//! - **Backend:** the [`EditingBackend`] trait and its value types
//! - **Memory:** an in-memory timeline for dry runs and tests
//! - **Xges:** project-file writer and reader
//! - **GES:** GStreamer Editing Services timeline (`ges` feature)

pub mod backend;
#[cfg(feature = "ges")]
pub mod ges_timeline;
pub mod memory;
pub mod xges;

pub use backend::*;
#[cfg(feature = "ges")]
pub use ges_timeline::{init_ges, GesTimeline};
pub use memory::{AssetCatalog, AssetInfo, MemoryTimeline};
pub use xges::{read_project_summary, ProjectSummary};
