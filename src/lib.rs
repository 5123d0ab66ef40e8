//! datasage - Autonomous data-science pipeline
//!
//! Chains four stages behind one entry point: load tabular data, summarize
//! it, compare candidate models, and explain the outcome in plain language.
//!
//! # Modules
//!
//! - [`ingest`] - Uploaded bytes to DataFrame (encoding ladder + spreadsheet fallback)
//! - [`eda`] - Structural summaries of a table
//! - [`training`] - Candidate classifiers and the automated comparison runner
//! - [`report`] - Plain-language reporting with a degrading local-model path
//! - [`pipeline`] - The fixed-order coordinator and its shared context
//! - [`cli`] - Command-line interface and interactive shell

// Core error handling
pub mod error;

// Pipeline stages
pub mod eda;
pub mod ingest;
pub mod report;
pub mod training;

// Coordination
pub mod pipeline;

// Services
pub mod cli;

pub use error::{DatasageError, Result};
pub use pipeline::{Coordinator, PipelineContext};
