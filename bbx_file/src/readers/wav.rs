//! WAV preset parsing and resampling.
//!
//! Grounded on `bbx_file/src/readers/wav.rs`'s `hound`+`wavers`+`tempfile` test idiom
//! (construction-time full-file load, per-channel sample vectors), extended to recover the
//! exact PCM bit-depth/format via `hound::WavReader::spec()` (which `wavers` abstracts
//! away) and to resample via `rubato`.

use std::path::Path;

use hound::WavReader;
use wavers::Wav;

use crate::error::{FileError, Result};

/// A fully decoded preset WAV: one `Vec<f32>` of samples per file channel.
pub struct DecodedPreset {
    pub sample_rate: f64,
    pub channel_count: usize,
    pub channels: Vec<Vec<f32>>,
}

/// Loads and fully decodes a preset WAV file. Control-thread only: allocates, reads the
/// whole file into memory.
pub fn load_preset(path: &Path) -> Result<DecodedPreset> {
    let spec = WavReader::open(path)
        .map_err(|e| FileError::InvalidWavFile(e.to_string()))?
        .spec();

    let channel_count = spec.channels as usize;
    if channel_count < 2 {
        return Err(FileError::UnsupportedChannelCount { found: channel_count, minimum: 2 });
    }

    let mut reader: Wav<f32> =
        Wav::from_path(path).map_err(|e| FileError::InvalidWavFile(e.to_string()))?;
    let sample_rate = reader.sample_rate() as f64;

    let mut channels: Vec<Vec<f32>> = (0..channel_count).map(|_| Vec::new()).collect();
    for (channel_index, channel) in reader.channels().enumerate() {
        channels[channel_index] = channel.iter().copied().collect();
    }

    Ok(DecodedPreset { sample_rate, channel_count, channels })
}

/// Resamples a single channel from `from_rate` to `to_rate` using a high-quality sinc
/// interpolator. Returns the input unchanged (cloned) if the rates already match.
pub fn resample_channel(samples: &[f32], from_rate: f64, to_rate: f64) -> Result<Vec<f32>> {
    if (from_rate - to_rate).abs() < 1e-6 {
        return Ok(samples.to_vec());
    }

    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    let ratio = to_rate / from_rate;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| FileError::ResampleFailed(e.to_string()))?;

    let output = resampler
        .process(&[samples.to_vec()], None)
        .map_err(|e| FileError::ResampleFailed(e.to_string()))?;

    Ok(output.into_iter().next().unwrap_or_default())
}
