//! Pure deterministic logic: shared types and comment composition.

pub mod compose;
pub mod types;
