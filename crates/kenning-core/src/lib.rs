//! Core types, configuration, and error handling for kenning.
//!
//! This crate provides the shared foundation used by all other kenning crates:
//! - [`KenningError`]: unified error type using `thiserror`
//! - [`KenningConfig`]: configuration loaded from `.kenning.toml`
//! - The revision data model: [`DiffLine`], [`DiffChange`], [`Difference`],
//!   [`DiffRevision`], [`DiffHistory`], [`CodeOwnerResult`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    HistoryConfig, KenningConfig, KnowledgeConfig, OblivionPolicy, OutputConfig, WeightPolicy,
};
pub use error::KenningError;
pub use types::{
    CodeOwnerResult, DiffChange, DiffHistory, DiffLine, DiffRevision, Difference, OutputFormat,
};

/// A convenience `Result` type for kenning operations.
pub type Result<T> = std::result::Result<T, KenningError>;
