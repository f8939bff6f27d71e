//! Clipforge Composition Model
//!
//! Defines the declarative input contracts for Clipforge:
//! - **Document:** typed, path-aware read access over parsed JSON
//! - **Composition:** resolution, frame rate, layers, clips, and output formats
//! - **Paths:** media and export location resolution
//! - **Formats:** output format tags and their container/codec table
//!
//! All time fields are whole seconds; conversion to timeline units happens
//! at compile time.

pub mod composition;
pub mod document;
pub mod format;
pub mod paths;

pub use composition::*;
pub use document::{DocumentError, Elements, FieldValue, Node};
pub use format::*;
pub use paths::*;
