//! Core trait abstractions.

pub mod capability;
pub mod tokenizer;
