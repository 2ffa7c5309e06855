//! Shared primitives for the GS type inference engine.
//!
//! This crate provides foundational types used across all `gs-*` crates:
//! - Source spans (`Span`, `Spanned`)
//! - Position/Range types for IDE-facing source locations
//! - Engine-wide limits and thresholds
//! - Numeric literal classification
//! - Script path normalization for provider indexes

pub mod limits;
pub mod numeric;
pub mod path;
pub mod position;
pub mod span;

pub use position::{Location, Position, Range};
pub use span::{Span, Spanned};
