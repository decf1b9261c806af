//! Error taxonomy for the spatializer core.

pub type Result<T> = std::result::Result<T, SpatializerError>;

#[derive(Debug, thiserror::Error)]
pub enum SpatializerError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to parse preset file: {0}")]
    FileParseError(String),

    #[error("unsupported channel count ({found}); need at least {minimum}")]
    UnsupportedChannelCount { found: usize, minimum: usize },

    #[error("invalid channel mapping: {0}")]
    InvalidChannelMapping(String),

    #[error("failed to construct convolver: {0}")]
    ConvolverSetupFailed(String),

    #[error("request too large: {0}")]
    RequestTooLarge(String),

    #[error("underlying host error: {0}")]
    UnderlyingHostError(String),

    #[error("invalid impulse response: {0}")]
    InvalidImpulseResponse(String),
}
