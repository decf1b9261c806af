//! End-to-end scenarios for the convolver/renderer/state-publication pipeline.

use bbx_dsp::convolver::Convolver;
use bbx_dsp::fft_cache::FftPlanCache;
use bbx_dsp::renderer::Renderer;
use bbx_dsp::state::{RendererState, StatePublisher};
use bbx_dsp::virtual_speaker::VirtualSpeaker;

fn ir_with_spike_at(len: usize, spike: usize) -> Vec<f32> {
    let mut ir = vec![0.0; len];
    ir[spike] = 1.0;
    ir
}

#[test]
fn dirac_identity() {
    let cache = FftPlanCache::new();
    let ir = ir_with_spike_at(8, 0);
    let l = Convolver::new(&ir, 4, &cache).unwrap();
    let r = Convolver::new(&ir, 4, &cache).unwrap();
    let mut renderer = Renderer::new(vec![(VirtualSpeaker::FrontLeft, l, r)], 4, 1.0, 1.0).unwrap();

    let block1 = vec![1.0f32, 0.0, 0.0, 0.0];
    let block2 = vec![0.0f32; 4];
    let mut l_out = vec![0.0; 4];
    let mut r_out = vec![0.0; 4];

    renderer.process(&[&block1], &mut l_out, &mut r_out, 4);
    assert_eq!(l_out, vec![1.0, 0.0, 0.0, 0.0]);
    assert_eq!(r_out, l_out);

    renderer.process(&[&block2], &mut l_out, &mut r_out, 4);
    assert_eq!(l_out, vec![0.0, 0.0, 0.0, 0.0]);
    assert_eq!(r_out, l_out);
}

#[test]
fn one_block_delay() {
    let cache = FftPlanCache::new();
    let ir = ir_with_spike_at(8, 4);
    let l = Convolver::new(&ir, 4, &cache).unwrap();
    let r = Convolver::new(&ir, 4, &cache).unwrap();
    let mut renderer = Renderer::new(vec![(VirtualSpeaker::FrontLeft, l, r)], 4, 1.0, 1.0).unwrap();

    let blocks = [vec![1.0f32, 0.0, 0.0, 0.0], vec![0.0f32; 4], vec![0.0f32; 4]];
    let expected = [vec![0.0f32; 4], vec![1.0f32, 0.0, 0.0, 0.0], vec![0.0f32; 4]];

    let mut l_out = vec![0.0; 4];
    let mut r_out = vec![0.0; 4];
    for (block, expected) in blocks.iter().zip(expected.iter()) {
        renderer.process(&[block], &mut l_out, &mut r_out, 4);
        for (a, b) in l_out.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }
}

#[test]
fn two_speaker_sum() {
    let cache = FftPlanCache::new();
    let ir = ir_with_spike_at(4, 0);
    let speakers = vec![
        (VirtualSpeaker::FrontLeft, Convolver::new(&ir, 4, &cache).unwrap(), Convolver::new(&ir, 4, &cache).unwrap()),
        (VirtualSpeaker::FrontRight, Convolver::new(&ir, 4, &cache).unwrap(), Convolver::new(&ir, 4, &cache).unwrap()),
    ];
    let mut renderer = Renderer::new(speakers, 4, 1.0, 1.0).unwrap();

    let ch0 = vec![1.0f32, 0.0, 0.0, 0.0];
    let ch1 = vec![2.0f32, 0.0, 0.0, 0.0];
    let mut l_out = vec![0.0; 4];
    let mut r_out = vec![0.0; 4];
    renderer.process(&[&ch0, &ch1], &mut l_out, &mut r_out, 4);
    assert_eq!(l_out, vec![3.0, 0.0, 0.0, 0.0]);
    assert_eq!(r_out, l_out);
}

#[test]
fn ild_gain_scales_each_ear_independently() {
    let cache = FftPlanCache::new();
    let ir = ir_with_spike_at(4, 0);
    let l = Convolver::new(&ir, 4, &cache).unwrap();
    let r = Convolver::new(&ir, 4, &cache).unwrap();
    let mut renderer = Renderer::new(vec![(VirtualSpeaker::FrontLeft, l, r)], 4, 2.0, 0.5).unwrap();

    let input = vec![1.0f32, 0.0, 0.0, 0.0];
    let mut l_out = vec![0.0; 4];
    let mut r_out = vec![0.0; 4];
    renderer.process(&[&input], &mut l_out, &mut r_out, 4);
    assert_eq!(l_out, vec![2.0, 0.0, 0.0, 0.0]);
    assert_eq!(r_out, vec![0.5, 0.0, 0.0, 0.0]);
}

#[test]
fn partial_trailing_block_passthrough_with_null_state() {
    let slot = StatePublisher::new().slot();
    assert!(slot.load().is_none());

    let ch0 = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    let ch1 = vec![7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0];
    let mut l_out = vec![0.0; 6];
    let mut r_out = vec![0.0; 6];
    Renderer::passthrough(&[&ch0, &ch1], &mut l_out, &mut r_out, 6);
    assert_eq!(l_out, ch0);
    assert_eq!(r_out, ch1);
}

#[test]
fn state_swap_never_observes_a_half_installed_generation() {
    let cache = FftPlanCache::new();
    let mut publisher = StatePublisher::new();
    let slot = publisher.slot();

    for generation in 0..2_000u64 {
        let ir = ir_with_spike_at(4, 0);
        let l = Convolver::new(&ir, 4, &cache).unwrap();
        let r = Convolver::new(&ir, 4, &cache).unwrap();
        let renderer = Renderer::new(vec![(VirtualSpeaker::FrontLeft, l, r)], 4, 1.0, 1.0).unwrap();
        publisher.publish(RendererState::new(renderer, generation));

        let guard = slot.load();
        let state = guard.as_ref().expect("just published");
        let input = vec![0.3f32; 4];
        let mut l_out = vec![0.0; 4];
        let mut r_out = vec![0.0; 4];
        // SAFETY: single-threaded test exercising the same discipline the real-time
        // thread would: one renderer_mut borrow per observed state, never re-entrant.
        unsafe {
            state.renderer_mut().process(&[&input], &mut l_out, &mut r_out, 4);
        }
        assert!(l_out.iter().all(|s| s.is_finite()));
        assert!(r_out.iter().all(|s| s.is_finite()));
        assert_eq!(state.generation(), generation);
    }
}
