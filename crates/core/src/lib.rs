//! Core types and configuration for the ntd-reader system.
//!
//! This crate provides shared types used across all other crates:
//! - Decoded record types (ticks, minute bars)
//! - .NET tick timestamp conversion
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
