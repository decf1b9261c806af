//! Multi-speaker binaural mixer: N per-speaker (L, R) convolver pairs summed to stereo.
//!
//! Grounded on the per-speaker convolver ownership and dispatch shape of
//! `bbx_dsp/src/blocks/effectors/binaural_decoder/mod.rs`'s `BinauralDecoderBlock`, narrowed
//! from ambisonic/surround decode strategies to the fixed virtual-speaker-indexed convolver
//! list this crate needs.

use crate::constants::MAX_VIRTUAL_SPEAKERS;
use crate::convolver::Convolver;
use crate::error::{Result, SpatializerError};
use crate::virtual_speaker::VirtualSpeaker;

/// One virtual speaker's pair of convolvers, plus the scratch blocks they render into.
struct SpeakerChannel {
    speaker: VirtualSpeaker,
    convolver_l: Convolver,
    convolver_r: Convolver,
    temp_l: Vec<f32>,
    temp_r: Vec<f32>,
}

/// Renders N input channels, each a virtual speaker, into a stereo binaural mix.
///
/// Immutable once built: every call to [`Renderer::process`] only mutates the convolvers'
/// internal history, never the speaker list or gains.
pub struct Renderer {
    block_size: usize,
    channels: Vec<SpeakerChannel>,
    gain_l: f32,
    gain_r: f32,
    /// Silence fed to a speaker whose input channel is missing from the caller's slice.
    zero_block: Vec<f32>,
}

impl Renderer {
    /// `speakers` pairs each virtual speaker with its (left-ear, right-ear) convolvers,
    /// already constructed at the target block size. `gain_l`/`gain_r` are the
    /// ILD-compensation gains derived once by the loader.
    pub fn new(
        speakers: Vec<(VirtualSpeaker, Convolver, Convolver)>,
        block_size: usize,
        gain_l: f32,
        gain_r: f32,
    ) -> Result<Self> {
        if speakers.is_empty() {
            return Err(SpatializerError::InvalidConfiguration("renderer needs at least one speaker".into()));
        }
        if speakers.len() > MAX_VIRTUAL_SPEAKERS {
            return Err(SpatializerError::InvalidConfiguration(format!(
                "renderer given {} speakers, exceeds the maximum of {MAX_VIRTUAL_SPEAKERS}",
                speakers.len()
            )));
        }
        for (_, l, r) in &speakers {
            if l.block_size() != block_size || r.block_size() != block_size {
                return Err(SpatializerError::InvalidConfiguration(
                    "every convolver in a renderer must share the renderer's block size".into(),
                ));
            }
        }

        let channels = speakers
            .into_iter()
            .map(|(speaker, convolver_l, convolver_r)| SpeakerChannel {
                speaker,
                convolver_l,
                convolver_r,
                temp_l: vec![0.0; block_size],
                temp_r: vec![0.0; block_size],
            })
            .collect();

        Ok(Self { block_size, channels, gain_l, gain_r, zero_block: vec![0.0; block_size] })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn speaker_count(&self) -> usize {
        self.channels.len()
    }

    pub fn speakers(&self) -> impl Iterator<Item = VirtualSpeaker> + '_ {
        self.channels.iter().map(|c| c.speaker)
    }

    /// Renders `frame_count` frames from `input_channels` (one slice per virtual speaker,
    /// each at least `frame_count` long) into `l_out`/`r_out`. Real-time safe: every
    /// intermediate buffer was allocated at construction time.
    ///
    /// `input_channels` may carry fewer entries than this renderer has speakers (a caller
    /// paused mid-way through a channel, or a layout mismatch); any speaker past the end of
    /// `input_channels` is fed silence rather than panicking.
    ///
    /// Frames beyond the last whole block are passed through per the trailing-block policy:
    /// left from input channel 0, right from input channel 1 (or channel 0, or silence).
    pub fn process(&mut self, input_channels: &[&[f32]], l_out: &mut [f32], r_out: &mut [f32], frame_count: usize) {
        debug_assert!(l_out.len() >= frame_count);
        debug_assert!(r_out.len() >= frame_count);

        let block_size = self.block_size;
        let whole_blocks = frame_count / block_size;
        let zero_block: &[f32] = &self.zero_block;

        for block in 0..whole_blocks {
            let start = block * block_size;
            let range = start..start + block_size;

            for (i, channel) in self.channels.iter_mut().enumerate() {
                let input = input_channels.get(i).map_or(zero_block, |ch| &ch[range.clone()]);
                channel.convolver_l.process(input, &mut channel.temp_l);
                channel.convolver_r.process(input, &mut channel.temp_r);
            }

            let l_block = &mut l_out[range.clone()];
            let r_block = &mut r_out[range.clone()];
            l_block.copy_from_slice(&self.channels[0].temp_l);
            r_block.copy_from_slice(&self.channels[0].temp_r);
            for channel in &self.channels[1..] {
                for (o, &s) in l_block.iter_mut().zip(channel.temp_l.iter()) {
                    *o += s;
                }
                for (o, &s) in r_block.iter_mut().zip(channel.temp_r.iter()) {
                    *o += s;
                }
            }

            if self.gain_l != 1.0 {
                l_block.iter_mut().for_each(|s| *s *= self.gain_l);
            }
            if self.gain_r != 1.0 {
                r_block.iter_mut().for_each(|s| *s *= self.gain_r);
            }
        }

        let remainder_start = whole_blocks * block_size;
        if remainder_start < frame_count {
            let range = remainder_start..frame_count;
            let left_src = input_channels.first();
            let right_src = input_channels.get(1).or(left_src);
            for (i, frame) in range.enumerate() {
                l_out[frame] = left_src.map_or(0.0, |ch| ch[remainder_start + i]);
                r_out[frame] = right_src.map_or(0.0, |ch| ch[remainder_start + i]);
            }
        }
    }

    /// Passthrough used when no renderer state has been published yet: stereo downmix of
    /// the raw input with no spatialization.
    pub fn passthrough(input_channels: &[&[f32]], l_out: &mut [f32], r_out: &mut [f32], frame_count: usize) {
        let left_src = input_channels.first();
        let right_src = input_channels.get(1).or(left_src);
        for i in 0..frame_count {
            l_out[i] = left_src.map_or(0.0, |ch| ch[i]);
            r_out[i] = right_src.map_or(0.0, |ch| ch[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft_cache::FftPlanCache;

    fn silent_convolver(block_size: usize, cache: &FftPlanCache) -> Convolver {
        let mut ir = vec![0.0; block_size];
        ir[0] = 1.0;
        Convolver::new(&ir, block_size, cache).unwrap()
    }

    #[test]
    fn single_speaker_passthrough_gain_one() {
        let cache = FftPlanCache::new();
        let block_size = 64;
        let speakers = vec![(
            VirtualSpeaker::FrontLeft,
            silent_convolver(block_size, &cache),
            silent_convolver(block_size, &cache),
        )];
        let mut renderer = Renderer::new(speakers, block_size, 1.0, 1.0).unwrap();

        let input = vec![0.5f32; block_size];
        let mut l = vec![0.0; block_size];
        let mut r = vec![0.0; block_size];
        renderer.process(&[&input], &mut l, &mut r, block_size);
        // First block only sees the zeroed overlap history; run a second block to observe
        // the identity impulse response take effect.
        renderer.process(&[&input], &mut l, &mut r, block_size);
        for (a, b) in l.iter().zip(input.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn rejects_empty_speaker_list() {
        let result = Renderer::new(Vec::new(), 64, 1.0, 1.0);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_mismatched_block_sizes() {
        let cache = FftPlanCache::new();
        let speakers =
            vec![(VirtualSpeaker::FrontLeft, silent_convolver(64, &cache), silent_convolver(128, &cache))];
        assert!(Renderer::new(speakers, 64, 1.0, 1.0).is_err());
    }

    #[test]
    fn trailing_partial_block_passes_through() {
        let cache = FftPlanCache::new();
        let block_size = 64;
        let speakers = vec![(
            VirtualSpeaker::FrontLeft,
            silent_convolver(block_size, &cache),
            silent_convolver(block_size, &cache),
        )];
        let mut renderer = Renderer::new(speakers, block_size, 1.0, 1.0).unwrap();

        let frame_count = block_size + 10;
        let input = vec![0.25f32; frame_count];
        let mut l = vec![0.0; frame_count];
        let mut r = vec![0.0; frame_count];
        renderer.process(&[&input], &mut l, &mut r, frame_count);
        for i in block_size..frame_count {
            assert_eq!(l[i], 0.25);
            assert_eq!(r[i], 0.25);
        }
    }

    #[test]
    fn missing_input_channel_is_treated_as_silence_not_a_panic() {
        let cache = FftPlanCache::new();
        let block_size = 64;
        let speakers = vec![
            (VirtualSpeaker::FrontLeft, silent_convolver(block_size, &cache), silent_convolver(block_size, &cache)),
            (VirtualSpeaker::FrontRight, silent_convolver(block_size, &cache), silent_convolver(block_size, &cache)),
        ];
        let mut renderer = Renderer::new(speakers, block_size, 1.0, 1.0).unwrap();

        // Only one of the two speakers' input channels is supplied.
        let input = vec![0.5f32; block_size];
        let mut l = vec![0.0; block_size];
        let mut r = vec![0.0; block_size];
        renderer.process(&[&input], &mut l, &mut r, block_size);
        renderer.process(&[&input], &mut l, &mut r, block_size);
        for (a, b) in l.iter().zip(input.iter()) {
            assert!((a - b).abs() < 1e-4, "missing second channel should contribute silence, not panic");
        }
    }

    #[test]
    fn passthrough_mono_duplicates_to_both_ears() {
        let input = vec![0.3f32; 16];
        let mut l = vec![0.0; 16];
        let mut r = vec![0.0; 16];
        Renderer::passthrough(&[&input], &mut l, &mut r, 16);
        assert_eq!(l, input);
        assert_eq!(r, input);
    }

    #[test]
    fn passthrough_with_no_channels_is_silent() {
        let mut l = vec![1.0f32; 4];
        let mut r = vec![1.0f32; 4];
        Renderer::passthrough(&[], &mut l, &mut r, 4);
        assert!(l.iter().all(|&s| s == 0.0));
        assert!(r.iter().all(|&s| s == 0.0));
    }
}
