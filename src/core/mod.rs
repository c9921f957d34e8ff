//! Core library components.
//!
//! This module contains the engine seam, the file and buffer operations built
//! on it, and configuration handling. Nothing here prints.

pub mod buffer;
pub mod config;
pub mod constants;
pub mod engine;
pub mod info;
pub mod keys;
pub mod model;
pub mod naming;
pub mod text;
pub mod transform;
pub mod types;
