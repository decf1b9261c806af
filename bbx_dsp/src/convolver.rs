//! Partitioned overlap-save FFT convolver.
//!
//! Grounded on the overlap-save shape of
//! `other_examples/12d8dafa_sierra-zero-rg3d-sound__src-hrtf.rs.rs`'s `convolve_overlap_save`
//! (zero-pad/FFT/pointwise-multiply/IFFT/discard-first-half), generalized from one full-length
//! FFT per impulse response to a partitioned frequency-domain delay line so that impulse
//! responses longer than a block stay real-time safe. FFT crate usage (`realfft`'s half-complex
//! convention) follows `Bojan20-reelforge-standalone/crates/rf-spatial/src/binaural/hrtf.rs`.

use std::sync::Arc;

use realfft::num_complex::Complex32;
use realfft::{ComplexToReal, RealToComplex};

use bbx_core::denormal::flush_denormal_f32;

use crate::error::{Result, SpatializerError};
use crate::fft_cache::FftPlanCache;

/// A single-channel partitioned-convolution engine for one HRIR (one ear, one virtual
/// speaker). Call `process` once per block on the real-time thread; it never allocates.
pub struct Convolver {
    block_size: usize,
    fft_size: usize,
    partitions: usize,
    /// Forward spectra of the (zero-padded) impulse response partitions, oldest tap first.
    hrir_spectra: Vec<Vec<Complex32>>,
    /// Frequency-domain delay line: one forward spectrum per partition of input history.
    fdl: Vec<Vec<Complex32>>,
    /// Index of the most recently written FDL slot. Decrements by one (mod `partitions`)
    /// every block. This MUST be a true modulo, never a power-of-two bitmask: `partitions`
    /// is `ceil(ir_len / block_size)` and is not generally a power of two, unlike the
    /// (optionally over-allocated) `hrir_spectra`/`fdl` slot *contents*.
    fdl_index: usize,
    /// Tail of the previous input block, forms the "old" half of the 2B analysis window.
    input_overlap: Vec<f32>,
    time_scratch: Vec<f32>,
    freq_scratch: Vec<Complex32>,
    accumulator: Vec<Complex32>,
    time_out: Vec<f32>,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
}

impl Convolver {
    /// Builds a convolver for `impulse_response` at the given block size. Partitions the
    /// impulse response into `ceil(len / block_size)` blocks, zero-padding the final one.
    /// Control-thread only: allocates and takes the FFT plan cache's lock.
    pub fn new(impulse_response: &[f32], block_size: usize, plan_cache: &FftPlanCache) -> Result<Self> {
        if impulse_response.is_empty() {
            return Err(SpatializerError::InvalidImpulseResponse("impulse response is empty".into()));
        }
        if block_size == 0 || !block_size.is_power_of_two() {
            return Err(SpatializerError::InvalidImpulseResponse(format!(
                "block size {block_size} must be a nonzero power of two"
            )));
        }

        let fft_size = block_size * 2;
        let partitions = impulse_response.len().div_ceil(block_size);
        let plan = plan_cache.get(fft_size);

        let mut time_scratch = plan.forward.make_input_vec();
        let mut freq_scratch = plan.forward.make_output_vec();
        let mut hrir_spectra = Vec::with_capacity(partitions);
        for p in 0..partitions {
            time_scratch.iter_mut().for_each(|s| *s = 0.0);
            let start = p * block_size;
            let end = (start + block_size).min(impulse_response.len());
            time_scratch[..end - start].copy_from_slice(&impulse_response[start..end]);
            plan.forward
                .process(&mut time_scratch, &mut freq_scratch)
                .map_err(|e| SpatializerError::ConvolverSetupFailed(e.to_string()))?;
            hrir_spectra.push(freq_scratch.clone());
        }

        let fdl = (0..partitions).map(|_| plan.forward.make_output_vec()).collect();
        let accumulator = plan.forward.make_output_vec();
        let time_out = plan.inverse.make_output_vec();

        tracing::debug!(ir_len = impulse_response.len(), block_size, partitions, "convolver built");

        Ok(Self {
            block_size,
            fft_size,
            partitions,
            hrir_spectra,
            fdl,
            fdl_index: 0,
            input_overlap: vec![0.0; block_size],
            time_scratch,
            freq_scratch,
            accumulator,
            time_out,
            forward: plan.forward,
            inverse: plan.inverse,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Convolves one block of `block_size` input samples, writing `block_size` output
    /// samples into `out`. Real-time safe: no allocation, no locking, no syscalls.
    ///
    /// # Panics
    /// Panics (via slice indexing) if `input.len() != self.block_size()` or
    /// `out.len() != self.block_size()`. The renderer upholds this by construction.
    pub fn process(&mut self, input: &[f32], out: &mut [f32]) {
        debug_assert_eq!(input.len(), self.block_size);
        debug_assert_eq!(out.len(), self.block_size);

        self.time_scratch[..self.block_size].copy_from_slice(&self.input_overlap);
        self.time_scratch[self.block_size..].copy_from_slice(input);
        self.input_overlap.copy_from_slice(input);

        self.forward.process(&mut self.time_scratch, &mut self.freq_scratch).expect("fixed-size realfft call");

        self.fdl_index = (self.fdl_index + self.partitions - 1) % self.partitions;
        debug_assert!(self.fdl_index < self.partitions, "FDL index must stay a true modulo of `partitions`");
        self.fdl[self.fdl_index].copy_from_slice(&self.freq_scratch);

        self.accumulator.iter_mut().for_each(|c| *c = Complex32::new(0.0, 0.0));
        for p in 0..self.partitions {
            let slot = (self.fdl_index + p) % self.partitions;
            let delayed = &self.fdl[slot];
            let tap = &self.hrir_spectra[p];
            for (acc, (d, h)) in self.accumulator.iter_mut().zip(delayed.iter().zip(tap.iter())) {
                *acc += d * h;
            }
        }

        let scale = 0.25 / self.fft_size as f32;
        self.accumulator.iter_mut().for_each(|c| *c *= scale);

        self.inverse.process(&mut self.accumulator, &mut self.time_out).expect("fixed-size realfft call");

        let tail = &self.time_out[self.block_size..];
        for (o, &t) in out.iter_mut().zip(tail.iter()) {
            *o = flush_denormal_f32(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len: usize) -> Vec<f32> {
        let mut ir = vec![0.0; len];
        ir[0] = 1.0;
        ir
    }

    #[test]
    fn unit_impulse_within_one_block_is_identity() {
        let cache = FftPlanCache::new();
        let mut conv = Convolver::new(&impulse(64), 64, &cache).unwrap();
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut out = vec![0.0; 64];
        conv.process(&input, &mut out);
        // First block through a unit impulse partition sees only the zeroed overlap
        // history for its non-delayed sample; the identity shows up once the pipeline
        // has flushed, i.e. by the second block.
        conv.process(&vec![0.0; 64], &mut out);
        for (a, b) in out.iter().zip(input.iter()) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn silence_in_produces_silence_out() {
        let cache = FftPlanCache::new();
        let mut conv = Convolver::new(&impulse(256), 64, &cache).unwrap();
        let mut out = vec![0.0; 64];
        for _ in 0..8 {
            conv.process(&vec![0.0; 64], &mut out);
            assert!(out.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn multi_partition_impulse_response_is_accepted() {
        let cache = FftPlanCache::new();
        // 3 partitions of 64 samples each.
        let conv = Convolver::new(&impulse(130), 64, &cache).unwrap();
        assert_eq!(conv.partitions(), 3);
    }

    #[test]
    fn empty_impulse_response_is_rejected() {
        let cache = FftPlanCache::new();
        assert!(Convolver::new(&[], 64, &cache).is_err());
    }

    #[test]
    fn non_power_of_two_block_size_is_rejected() {
        let cache = FftPlanCache::new();
        assert!(Convolver::new(&impulse(64), 100, &cache).is_err());
    }

    #[test]
    fn fdl_index_never_exceeds_partition_count() {
        let cache = FftPlanCache::new();
        let mut conv = Convolver::new(&impulse(5 * 64), 64, &cache).unwrap();
        let mut out = vec![0.0; 64];
        for _ in 0..50 {
            conv.process(&vec![0.1; 64], &mut out);
            assert!(conv.fdl_index < conv.partitions);
        }
    }
}
