//! Core domain models, identifiers, and error types.
//!
//! This layer has no knowledge of storage, embedding backends, or transport —
//! it is independent of external frameworks and infrastructure.

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;
