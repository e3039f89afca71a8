//! quire: a terminal e-book reader shell.
//!
//! A tabbed host (bookshelf, discovery, RSS, settings) behind a bottom
//! navigation bar, with first-run help, update log, back-key exit handling
//! and background maintenance of the local library.

pub mod app;
pub mod assets;
pub mod config;
pub mod dialog;
pub mod keybindings;
pub mod pages;
pub mod paths;
pub mod preferences;
pub mod shell;
pub mod storage;
pub mod tasks;
pub mod theme;
pub mod ui;
pub mod util;
