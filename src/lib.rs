//! relgen: LLM-generated pull request descriptions, labels, reviews and
//! release notes (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod config;
pub mod constants;
pub mod context;
pub mod diff;
pub mod env;
pub mod generation;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod providers;
pub mod remote;
pub mod review;
pub mod write;
