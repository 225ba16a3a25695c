//! Error types shared by the facade, the players and the C interface.

use thiserror::Error;

/// Errors reported by the audio facade and the player library.
#[derive(Debug, Error)]
pub enum AudioError {
    /// `play`/`position` was called before a player was initialized.
    #[error("audio player has not been initialized")]
    NotInitialized,

    /// `init` was called after a player already exists.
    #[error("audio player is already initialized")]
    AlreadyInitialized,

    /// `init` was called before any song was installed.
    #[error("no song has been installed")]
    NoSong,

    /// A song was already installed for this process.
    #[error("a song is already installed")]
    SongAlreadyInstalled,

    /// The song file could not be decoded.
    #[error("failed to load song: {0}")]
    SongLoad(#[from] hound::Error),

    /// The song file decoded but its layout is not playable.
    #[error("unsupported song format: {0}")]
    UnsupportedFormat(String),

    /// The audio output device could not be opened or started.
    #[error("audio output error: {0}")]
    Output(String),

    /// The render thread pool could not be created.
    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file is not valid JSON for [`crate::AudioConfig`].
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A null or otherwise unusable argument crossed the C boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl AudioError {
    /// Stable numeric code exposed through `AudioLastError`.
    ///
    /// Zero is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            AudioError::NotInitialized => 1,
            AudioError::AlreadyInitialized => 2,
            AudioError::NoSong => 3,
            AudioError::SongAlreadyInstalled => 4,
            AudioError::SongLoad(_) => 5,
            AudioError::UnsupportedFormat(_) => 6,
            AudioError::Output(_) => 7,
            AudioError::ThreadPool(_) => 8,
            AudioError::Config(_) | AudioError::ConfigParse(_) => 9,
            AudioError::Io(_) => 10,
            AudioError::InvalidArgument(_) => 11,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AudioError>;
