//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and the markers written into remote content so a rename only requires
//! changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "relgen";

/// Local config filename (e.g. `.relgen.toml` in the working directory).
pub const CONFIG_FILENAME: &str = ".relgen.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "relgen";

/// REST root of github.com.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PROVIDER: &str = "RELGEN_PROVIDER";
pub const ENV_MODEL: &str = "RELGEN_MODEL";
pub const ENV_API_KEY: &str = "RELGEN_API_KEY";
pub const ENV_BASE_URL: &str = "RELGEN_BASE_URL";
pub const ENV_GITHUB_TOKEN: &str = "RELGEN_GITHUB_TOKEN";
pub const ENV_GITHUB_TOKEN_FALLBACK: &str = "GITHUB_TOKEN";
/// Set by GitHub Actions runners, including on Enterprise Server.
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_LOG: &str = "RELGEN_LOG";

// ── Markers in remote content ───────────────────────────────────────

/// Marks the comment holding a generated pull request description.
pub const DESCRIBE_TAG: &str = "<!-- Generated by Relgen -->";

/// Marks the body of a generated review.
pub const REVIEW_TAG: &str = "<!-- Reviewed by Relgen -->";

/// Opens the hidden block carrying describe metadata.
pub const METADATA_OPEN: &str = "<!-- METADATA";

/// Closes the metadata block.
pub const METADATA_CLOSE: &str = "-->";
