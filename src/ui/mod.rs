//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input routing to dialog, help, shell and pages
//! - `events` - Background task event processing
//! - `render` - Frame layout and the bottom navigation bar
//! - `dialog` - Markdown text dialog (help document, update log)
//! - `help` - Keybinding overlay
//! - `status` - Status bar widget

mod dialog;
mod events;
mod help;
mod input;
mod loop_runner;
mod render;
mod status;

pub use dialog::render_markdown;
pub use loop_runner::{run, Action};
