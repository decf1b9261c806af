//! Error taxonomy for preset file I/O.

pub type Result<T> = std::result::Result<T, FileError>;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("invalid WAV file: {0}")]
    InvalidWavFile(String),

    #[error("unsupported channel count ({found}); need at least {minimum}")]
    UnsupportedChannelCount { found: usize, minimum: usize },

    #[error("resampling failed: {0}")]
    ResampleFailed(String),
}
