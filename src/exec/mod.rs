// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the preview server a serving renderer asks for, using
//! `tokio::process::Command`, and exposes it to the serve loop through the
//! [`PreviewProcess`] trait so tests can substitute a fake.

pub mod preview;

pub use preview::{open_browser, spawn_preview, ChildPreview, PreviewCommand, PreviewProcess};
