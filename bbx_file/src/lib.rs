//! # BBX File
//!
//! HRIR preset file I/O: WAV parsing (format/bit-depth recovery, multi-channel sample
//! extraction) and resampling to a target device rate.
//!
//! ## Usage
//!
//! ```ignore
//! use bbx_file::readers::wav::load_preset;
//!
//! let preset = load_preset("hrir.wav")?;
//! let resampled = bbx_file::readers::wav::resample_channel(&preset.channels[0], preset.sample_rate, 48_000.0)?;
//! ```

pub mod error;
pub mod readers;
