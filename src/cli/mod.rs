//! CLI module - command-line interface
//!
//! Contains the REPL, command parsing and event rendering.

pub mod commands;
pub mod repl;

pub use repl::{render_event, Repl};
