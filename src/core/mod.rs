//! Core business abstractions

pub mod config;
pub mod currency;
pub mod log;
pub mod project;

// Re-export main types for cleaner imports
pub use currency::{RateError, RateSource};
pub use project::{ProjectPatch, ProjectRecord, ValidationError};
