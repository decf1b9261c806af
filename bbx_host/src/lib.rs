//! # BBX Host
//!
//! Control-thread orchestrator for the binaural spatializer: loads a JSON
//! [`SessionConfig`](config::SessionConfig), decodes the active preset through `bbx_file`,
//! builds a renderer through `bbx_dsp`, and drives a [`Session`](session::Session) that owns
//! the running `bbx_device` stream.

pub mod config;
pub mod session;

pub use config::{ConfigError, PresetConfig, SessionConfig};
pub use session::Session;
