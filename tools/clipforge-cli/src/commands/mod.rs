pub mod check;
pub mod inspect;
pub mod render;
pub mod validate;
