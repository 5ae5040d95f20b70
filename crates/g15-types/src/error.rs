//! Error types for g15control.

use std::io;

/// Errors produced by the g15control crates.
#[derive(Debug, thiserror::Error)]
pub enum G15Error {
    #[error("surface error: {0}")]
    Surface(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("plugin error: {0}")]
    Plugin(String),

    #[error("process error: {0}")]
    Process(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, G15Error>;
