//! Data types for documents, evidence, scores and reports.

pub mod answer;
pub mod config;
pub mod document;
pub mod matrix;
pub mod report;
