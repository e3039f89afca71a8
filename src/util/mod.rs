//! Text helpers for rendering names and timestamps in the terminal.

mod text;

pub use text::{
    display_width, format_relative_time, format_size, sanitize_line, truncate_to_width,
};

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
