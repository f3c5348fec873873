//! Stateful Context – persistent, keyword-driven state for AI conversations
//!
//! This crate implements:
//! - Named states with lazily initialized values and rendered descriptions
//! - Keyword actions the model invokes with `<!-- keyword -->` markers
//! - Prompt synthesis of the active states for context injection
//! - Dispatch of generated text into state transitions
//! - A restricted expression language for initializers, renderers and transitions
//! - File-backed persistence, a turn journal and a single-task session driver

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Restricted expression language used by state definitions
pub mod interpreter;
/// State engine, persistence and session plumbing
pub mod runtime;

// Re-export key types for convenience
pub use runtime::{Session, SessionConfig};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
