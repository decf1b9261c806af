//! Partitioned-convolution binaural spatializer core.
//!
//! `convolver` implements the single-channel real-time FFT engine; `renderer` fans it out
//! across virtual speakers; `state` publishes a built `Renderer` to the real-time thread
//! without locks; `preset` turns decoded impulse-response channels into a `Renderer`.

pub mod channel_map;
pub mod constants;
pub mod convolver;
pub mod error;
pub mod fft_cache;
pub mod preset;
pub mod renderer;
pub mod sample;
pub mod state;
pub mod virtual_speaker;
