//! File sources layered on top of the defaults.

pub mod global_file;
pub mod workspace_file;
