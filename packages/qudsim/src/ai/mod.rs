//! Capability implementations backed by hosted models.
//!
//! This module provides reference implementations of the `Capability`
//! trait. Users can use these directly or implement their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
