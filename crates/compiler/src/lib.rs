//! Clipforge Compiler
//!
//! Turns a composition document into a committed editing timeline and a
//! saved project file. Works against any [`clipforge_timeline::EditingBackend`].

pub mod clip;
pub mod composition;
pub mod layer;

pub use clip::{clip_placement, compile_clip, scaled_size, ClipContext, DEFAULT_TITLE_FONT};
pub use composition::{
    compile_file, compile_timeline, composition_error, load_composition, CompiledComposition,
};
pub use layer::compile_layer;
