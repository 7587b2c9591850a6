//! Failures while reading, validating or writing Patrol settings.

/// Result alias used throughout `patrol-config`.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Why a settings file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be opened or read.
    #[error("cannot read settings from '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// The file or one of its parent directories could not be written.
    #[error("cannot write settings to '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Not valid TOML, or a key has the wrong type.
    #[error("settings are not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The in-memory settings could not be rendered as TOML.
    #[error("cannot render settings as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Well-formed but unusable, such as `timeout_secs = 0`.
    #[error("bad value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
