//! TUI Views module
//!
//! Contains the view implementations for the TUI.

mod patch_list;

pub use patch_list::{PatchListView, PatchRow, category_color};
