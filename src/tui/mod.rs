//! Terminal User Interface module for psort
//!
//! This module provides a keyboard-driven TUI for tagging patches. It shows
//! a progress screen while the patch source is being fetched, then the patch
//! list with the active filter.

#[cfg(feature = "tui")]
mod app;
#[cfg(feature = "tui")]
mod status;
#[cfg(feature = "tui")]
mod views;

#[cfg(feature = "tui")]
pub use app::run_tui;
