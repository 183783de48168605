//! Configuration loading and layering.
//!
//! Handles `.relgen.toml` loading, environment variable resolution,
//! and CLI flag merging with proper priority ordering.

pub mod loader;

pub use loader::{
    AscribeConfig, Config, ConfigError, DescribeConfig, GenerationConfig, LabelConfig,
    ProviderConfig, ReleaseDescribeConfig, RemoteConfig, ReviewConfig, TextSource,
};
