//! Core module - shared infrastructure for Parley
//!
//! This module contains foundational types, configuration, error handling
//! and the record framing shared by every streaming boundary.

pub mod config;
pub mod error;
pub mod framing;
pub mod types;

pub use config::Config;
pub use error::{ParleyError, Result};
pub use framing::RecordBuffer;
pub use types::*;
