//! # codectx
//!
//! Indexes a codebase's files and git history into a vector store, exposed
//! as retrieval tool calls for LLM coding agents.
//!
//! ## Architecture
//!
//! The crate is organized following Domain-Driven Design principles:
//!
//! - `domain`: Core business models and error types
//! - `application`: Use cases and orchestration logic
//! - `connector`: External integrations (vector store, embeddings, git, MCP)

pub mod application;
pub mod cli;
pub mod config;
pub mod connector;
pub mod domain;

pub use application::*;
pub use config::*;
pub use connector::*;
pub use domain::*;
