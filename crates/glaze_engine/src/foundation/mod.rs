//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and GLSL-style helpers
//! - Color parsing and formatting
//! - Logging utilities

pub mod math;
pub mod color;
pub mod logging;

pub use color::{Color, ColorParseError};
