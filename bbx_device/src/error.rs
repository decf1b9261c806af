//! Error taxonomy for the composite-device binding.

use bbx_dsp::error::SpatializerError;

pub type Result<T> = std::result::Result<T, DeviceError>;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("request too large: {0}")]
    RequestTooLarge(String),

    #[error("underlying host error: {0}")]
    UnderlyingHostError(String),
}

/// Lets callers above the composite-device layer (the `bbx_host` orchestrator) handle one
/// unified error type instead of matching on both `DeviceError` and `SpatializerError`.
impl From<DeviceError> for SpatializerError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::InvalidConfiguration(msg) => SpatializerError::InvalidConfiguration(msg),
            DeviceError::RequestTooLarge(msg) => SpatializerError::RequestTooLarge(msg),
            DeviceError::UnderlyingHostError(msg) => SpatializerError::UnderlyingHostError(msg),
        }
    }
}
