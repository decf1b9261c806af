//! Orchestration: turns a [`SessionConfig`] plus a decoded preset into a running
//! [`CompositeDeviceStream`], and republishes the renderer whenever the active preset,
//! compensation toggle, or manual balance changes.
//!
//! Grounded on `bbx_audio/src/main.rs`'s minimal construct-wire-run shape, generalized
//! from a static `Graph` build to loading a preset file and publishing it through
//! `bbx_dsp::state`.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bbx_device::stream::CompositeDeviceStream;
use bbx_dsp::constants::DEFAULT_BLOCK_SIZE;
use bbx_dsp::error::SpatializerError;
use bbx_dsp::fft_cache::FftPlanCache;
use bbx_dsp::preset::{build_renderer, resolve_channel_map};
use bbx_dsp::state::{CompensationGains, RendererState, StatePublisher};
use bbx_dsp::virtual_speaker::InputLayout;
use bbx_file::readers::wav::{load_preset, resample_channel};

use crate::config::{PresetConfig, SessionConfig};

/// Decodes `preset.file_path`, resamples every channel to `sample_rate`, resolves a
/// channel map for `layout`, and builds a ready-to-publish renderer.
pub fn load_renderer(
    preset: &PresetConfig,
    layout: &InputLayout,
    block_size: usize,
    sample_rate: u32,
    compensation_enabled: bool,
    manual_balance: f32,
    plan_cache: &FftPlanCache,
) -> anyhow::Result<(bbx_dsp::renderer::Renderer, CompensationGains)> {
    let decoded = load_preset(&preset.file_path)?;
    let ir_channels: Vec<Vec<f32>> = decoded
        .channels
        .iter()
        .map(|channel| resample_channel(channel, decoded.sample_rate, sample_rate as f64))
        .collect::<Result<_, _>>()?;

    let map = resolve_channel_map(layout, ir_channels.len())?;
    let (renderer, gains) =
        build_renderer(&ir_channels, layout, &map, block_size, compensation_enabled, manual_balance, plan_cache)?;
    Ok((renderer, gains))
}

/// Owns the running device stream, the FFT plan cache, and the publish-side generation
/// counter. The control thread drives all mutation through this type; the real-time
/// thread only ever sees what it publishes.
pub struct Session {
    device: CompositeDeviceStream,
    publisher: StatePublisher,
    plan_cache: FftPlanCache,
    generation: u64,
    layout: InputLayout,
    block_size: usize,
    sample_rate: u32,
}

impl Session {
    pub fn new(config: &SessionConfig) -> anyhow::Result<Self> {
        let layout = config
            .input_layout
            .resolve()
            .ok_or_else(|| SpatializerError::InvalidConfiguration("unrecognized input_layout".into()))?;

        let mut publisher = StatePublisher::new();
        let slot: Arc<ArcSwapOption<RendererState>> = publisher.slot();
        let device = CompositeDeviceStream::new(slot);

        device.configure_stream(
            layout.len(),
            layout.len().max(config.output_pair_base + 2),
            config.output_pair_base,
            config.sample_rate,
            config.max_frames_per_callback,
        )?;

        let mut session = Self {
            device,
            publisher,
            plan_cache: FftPlanCache::new(),
            generation: 0,
            layout,
            // Convolver/renderer block size is fixed independent of the hardware's
            // per-callback frame count: partitioning relies on it staying a constant
            // power of two across the session, and `Convolver::new` rejects anything
            // else. `max_frames_per_callback` only sizes the cpal stream buffers.
            block_size: DEFAULT_BLOCK_SIZE,
            sample_rate: config.sample_rate,
        };

        if let Some(preset) = &config.active_preset {
            session.activate_preset(preset, config.compensation_enabled, config.manual_balance)?;
        }

        Ok(session)
    }

    /// Loads `preset`, builds a new renderer, and publishes it, replacing whatever was
    /// previously active. The previous `RendererState` is kept alive by `StatePublisher`
    /// until the real-time thread has observed the swap.
    pub fn activate_preset(
        &mut self,
        preset: &PresetConfig,
        compensation_enabled: bool,
        manual_balance: f32,
    ) -> anyhow::Result<()> {
        let (renderer, _gains) = load_renderer(
            preset,
            &self.layout,
            self.block_size,
            self.sample_rate,
            compensation_enabled,
            manual_balance,
            &self.plan_cache,
        )?;

        self.generation += 1;
        self.publisher.publish(RendererState::new(renderer, self.generation));
        Ok(())
    }

    pub fn start(&self) -> anyhow::Result<()> {
        self.device.start()?;
        Ok(())
    }

    pub fn stop(&self) -> anyhow::Result<()> {
        self.device.stop()?;
        Ok(())
    }

    pub fn set_output_pair(&self, output_pair_base: usize) -> anyhow::Result<()> {
        self.device.set_output_pair(output_pair_base)?;
        Ok(())
    }

    /// Drains any real-time bounds-check overruns reported by the render callback since
    /// the last call. The callback itself never logs or raises; this is where that report
    /// turns into an actual `SpatializerError::RequestTooLarge` the control thread can act
    /// on (surface to the operator, or drop the session).
    pub fn poll_overruns(&self) -> Result<(), SpatializerError> {
        self.device.take_overrun()?;
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
