//! # Connector Layer
//!
//! External integrations implementing the `application` layer's interfaces:
//! - `adapter`: tree-sitter chunking, embedding, vector store, snapshot
//!   storage, git subprocess extraction, and the MCP tool-call surface
//! - `api`: dependency-injection container wiring adapters into use cases

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;
