//! Lock-free publication of a `Renderer` from the control thread to the real-time thread.
//!
//! Grounded on `bbx_core::spsc`'s "construct with a lock, operate wait-free afterward"
//! discipline, extended here to a single-slot `arc_swap::ArcSwapOption` instead of a ring
//! buffer, since the real-time thread only ever needs the *latest* renderer, not a queue of
//! them. The generation-observation channel reuses `bbx_core::spsc::SpscRingBuffer` directly.

use std::cell::UnsafeCell;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use bbx_core::spsc::{Consumer, Producer, SpscRingBuffer};

use crate::renderer::Renderer;

/// An immutable, published renderer plus the generation counter that identifies it.
///
/// The `Renderer` itself is not immutable in the Rust-type sense: its convolvers carry
/// real-time-thread-owned history (FDL, overlap). Exactly one real-time thread ever calls
/// [`RendererState::renderer_mut`] for a given instance, and it never does so
/// re-entrantly, so the `UnsafeCell` access below never aliases.
pub struct RendererState {
    renderer: UnsafeCell<Renderer>,
    generation: u64,
}

// SAFETY: shared across the acquire-load boundary by design (`arc_swap` hands out `Arc<Self>`
// to the real-time thread); the single-writer/single-reader discipline documented on
// `renderer_mut` is what makes that safe, not `Sync` in the usual "many readers" sense.
unsafe impl Sync for RendererState {}

impl RendererState {
    pub fn new(renderer: Renderer, generation: u64) -> Self {
        Self { renderer: UnsafeCell::new(renderer), generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Exclusive access to the renderer for real-time processing.
    ///
    /// # Safety
    /// The caller must be the single real-time audio thread, and must not call this
    /// re-entrantly for the same `RendererState` (i.e. not from inside another live
    /// `renderer_mut` borrow, including across nested callback invocations).
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn renderer_mut(&self) -> &mut Renderer {
        unsafe { &mut *self.renderer.get() }
    }
}

/// Per-channel linear gains applied after mixing, kept outside `RendererState` so that
/// balance/compensation toggles can republish without tearing down and rebuilding every
/// convolver in the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensationGains {
    pub left: f32,
    pub right: f32,
}

impl CompensationGains {
    pub const UNITY: CompensationGains = CompensationGains { left: 1.0, right: 1.0 };
}

/// The publication cell for [`CompensationGains`]: a separate `ArcSwap` so that
/// `set_compensation_enabled`/`set_manual_balance` can republish without touching a single
/// `Convolver`.
pub type CompensationGainsCell = arc_swap::ArcSwap<CompensationGains>;

pub fn compensation_gains_cell(initial: CompensationGains) -> CompensationGainsCell {
    arc_swap::ArcSwap::new(Arc::new(initial))
}

/// Control-thread side of renderer-state publication. Retains the previously published
/// state until the next publish, per the "simplest correct scheme" of keeping a state
/// alive until it is known to be superseded.
pub struct StatePublisher {
    slot: Arc<ArcSwapOption<RendererState>>,
    previous: Option<Arc<RendererState>>,
}

impl StatePublisher {
    pub fn new() -> Self {
        Self { slot: Arc::new(ArcSwapOption::from(None)), previous: None }
    }

    /// A cloneable handle the real-time thread uses to acquire-load the current state.
    pub fn slot(&self) -> Arc<ArcSwapOption<RendererState>> {
        self.slot.clone()
    }

    /// Publishes `state`, retaining the previously published `Arc` so any in-flight
    /// real-time callback holding a guard over it keeps valid data. Called only from the
    /// control thread.
    pub fn publish(&mut self, state: RendererState) {
        let new = Arc::new(state);
        let old = self.slot.swap(Some(new));
        self.previous = old;
    }

    /// Publishes a null state, falling the render callback back to passthrough.
    pub fn deactivate(&mut self) {
        let old = self.slot.swap(None);
        self.previous = old;
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Real-time-thread side of the generation-observation channel: non-blocking, allocation-free.
pub struct GenerationReporter {
    producer: Producer<u64>,
}

impl GenerationReporter {
    /// Reports that `generation` was observed by the current callback. Drops the report
    /// silently on a full channel rather than blocking or allocating.
    pub fn report(&mut self, generation: u64) {
        let _ = self.producer.try_push(generation);
    }
}

/// Control-thread side of the generation-observation channel.
pub struct GenerationMonitor {
    consumer: Consumer<u64>,
}

impl GenerationMonitor {
    /// Drains all pending reports, returning the most recently observed generation, if any.
    pub fn latest_observed(&mut self) -> Option<u64> {
        let mut latest = None;
        while let Some(generation) = self.consumer.try_pop() {
            latest = Some(generation);
        }
        latest
    }
}

/// Builds a paired reporter/monitor with the given channel capacity.
pub fn generation_channel(capacity: usize) -> (GenerationReporter, GenerationMonitor) {
    let (producer, consumer) = SpscRingBuffer::new::<u64>(capacity);
    (GenerationReporter { producer }, GenerationMonitor { consumer })
}

#[cfg(loom)]
mod loom_tests {
    use std::sync::Arc;

    use arc_swap::ArcSwapOption;
    use loom::thread;

    use super::RendererState;
    use crate::convolver::Convolver;
    use crate::fft_cache::FftPlanCache;
    use crate::virtual_speaker::VirtualSpeaker;

    fn tiny_state(generation: u64) -> RendererState {
        let cache = FftPlanCache::new();
        let mut ir = vec![0.0; 4];
        ir[0] = 1.0;
        let l = Convolver::new(&ir, 4, &cache).unwrap();
        let r = Convolver::new(&ir, 4, &cache).unwrap();
        let renderer = crate::renderer::Renderer::new(vec![(VirtualSpeaker::FrontLeft, l, r)], 4, 1.0, 1.0).unwrap();
        RendererState::new(renderer, generation)
    }

    /// Mirrors `bbx_core::spsc`'s `loom_tests`: builds the (expensive) fixtures once, outside
    /// `loom::model`, then lets loom explore the publish/load interleavings across two threads.
    /// A real-time thread loading the slot must only ever observe `None` or one of the two
    /// published generations, never a torn or half-installed state.
    #[test]
    fn publish_never_observed_as_half_installed() {
        let first = Arc::new(tiny_state(1));
        let second = Arc::new(tiny_state(2));

        loom::model(move || {
            let slot: Arc<ArcSwapOption<RendererState>> = Arc::new(ArcSwapOption::from(None));

            let publisher_slot = slot.clone();
            let first = first.clone();
            let second = second.clone();
            let publisher = thread::spawn(move || {
                publisher_slot.store(Some(first));
                publisher_slot.store(Some(second));
            });

            let reader_slot = slot.clone();
            let reader = thread::spawn(move || {
                let guard = reader_slot.load();
                guard.as_ref().map(|state| state.generation())
            });

            publisher.join().unwrap();
            let observed = reader.join().unwrap();
            assert!(matches!(observed, None | Some(1) | Some(2)));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convolver::Convolver;
    use crate::fft_cache::FftPlanCache;
    use crate::virtual_speaker::VirtualSpeaker;

    fn tiny_renderer() -> Renderer {
        let cache = FftPlanCache::new();
        let mut ir = vec![0.0; 64];
        ir[0] = 1.0;
        let l = Convolver::new(&ir, 64, &cache).unwrap();
        let r = Convolver::new(&ir, 64, &cache).unwrap();
        Renderer::new(vec![(VirtualSpeaker::FrontLeft, l, r)], 64, 1.0, 1.0).unwrap()
    }

    #[test]
    fn publish_then_load_observes_new_generation() {
        let mut publisher = StatePublisher::new();
        let slot = publisher.slot();
        assert!(slot.load().is_none());

        publisher.publish(RendererState::new(tiny_renderer(), 1));
        let guard = slot.load();
        let state = guard.as_ref().unwrap();
        assert_eq!(state.generation(), 1);
    }

    #[test]
    fn deactivate_publishes_null_state() {
        let mut publisher = StatePublisher::new();
        publisher.publish(RendererState::new(tiny_renderer(), 1));
        publisher.deactivate();
        assert!(publisher.slot().load().is_none());
    }

    #[test]
    fn generation_monitor_sees_latest_report() {
        let (mut reporter, mut monitor) = generation_channel(4);
        reporter.report(1);
        reporter.report(2);
        reporter.report(3);
        assert_eq!(monitor.latest_observed(), Some(3));
        assert_eq!(monitor.latest_observed(), None);
    }

    #[test]
    fn compensation_gains_cell_round_trips() {
        let cell = compensation_gains_cell(CompensationGains::UNITY);
        assert_eq!(*cell.load_full(), CompensationGains::UNITY);
        cell.store(Arc::new(CompensationGains { left: 1.2, right: 0.8 }));
        assert_eq!(*cell.load_full(), CompensationGains { left: 1.2, right: 0.8 });
    }

    #[test]
    fn renderer_mut_allows_processing_through_shared_state() {
        let state = RendererState::new(tiny_renderer(), 7);
        let input = vec![0.2f32; 64];
        let mut l = vec![0.0; 64];
        let mut r = vec![0.0; 64];
        // SAFETY: single-threaded test, no re-entrant borrow.
        unsafe {
            state.renderer_mut().process(&[&input], &mut l, &mut r, 64);
        }
        assert_eq!(l.len(), 64);
    }
}
