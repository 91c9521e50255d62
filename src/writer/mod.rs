//! Output formats for a compiled `Script`.
pub mod json;
pub mod listing;
