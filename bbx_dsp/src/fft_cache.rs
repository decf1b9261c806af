//! Process-wide FFT plan cache, keyed by FFT size.
//!
//! FFT plans and twiddle factors are shared read-only across convolvers through this
//! cache. Construction (and therefore locking) only happens while building a `Convolver`,
//! which only ever happens on the control thread; the real-time thread never touches it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

#[derive(Clone)]
pub struct FftPlanPair {
    pub forward: Arc<dyn RealToComplex<f32>>,
    pub inverse: Arc<dyn ComplexToReal<f32>>,
}

pub struct FftPlanCache {
    planner: Mutex<RealFftPlanner<f32>>,
    plans: Mutex<HashMap<usize, FftPlanPair>>,
}

impl FftPlanCache {
    pub fn new() -> Self {
        Self { planner: Mutex::new(RealFftPlanner::new()), plans: Mutex::new(HashMap::new()) }
    }

    /// Returns the plan pair for `fft_size`, constructing and caching it on first use.
    pub fn get(&self, fft_size: usize) -> FftPlanPair {
        if let Some(pair) = self.plans.lock().unwrap().get(&fft_size) {
            return pair.clone();
        }
        let mut planner = self.planner.lock().unwrap();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let pair = FftPlanPair { forward, inverse };
        self.plans.lock().unwrap().insert(fft_size, pair.clone());
        tracing::debug!(fft_size, "planned new fft size");
        pair
    }
}

impl Default for FftPlanCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_return_same_plan_size() {
        let cache = FftPlanCache::new();
        let a = cache.get(1024);
        let b = cache.get(1024);
        assert_eq!(a.forward.len(), b.forward.len());
        assert_eq!(a.forward.len(), 1024);
    }

    #[test]
    fn distinct_sizes_cached_independently() {
        let cache = FftPlanCache::new();
        let small = cache.get(8);
        let large = cache.get(1024);
        assert_eq!(small.forward.len(), 8);
        assert_eq!(large.forward.len(), 1024);
    }
}
