//! # lib-types
//!
//! Core type definitions for MT channel response evaluation.
//!
//! This crate provides foundational types used throughout the workspace:
//! - Physical units with compile-time safety and a unit-tag registry
//! - Frequency grid helpers
//! - StationXML-style response records for interchange

pub mod units;
pub mod response;

pub use units::*;
pub use response::*;

/// Re-export num_complex for convenience
pub use num_complex::Complex64;
