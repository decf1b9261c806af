//! Composite-device binding: owns the cpal streams, the render callback, and the
//! {Stopped → Configuring → Running ⇄ Paused → Stopped} state machine.
//!
//! Grounded on `bbx_player/src/backends/cpal.rs`'s host/device/`build_output_stream` shape,
//! replacing its `Mutex`-guarded iterator with the lock-free acquire-load path the
//! spatializer core requires, and adding planar (non-interleaved) channel buffering since
//! `cpal`'s callback delivers interleaved samples by default. Input is bridged from a
//! separate `cpal` input stream through `bbx_core::spsc` ring buffers (one per input
//! channel) rather than the synchronous single-callback duplex some native APIs offer,
//! since `cpal` itself does not expose one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};

use bbx_core::spsc::{Consumer, Producer, SpscRingBuffer};
use bbx_dsp::renderer::Renderer;
use bbx_dsp::state::RendererState;

use crate::error::{DeviceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLifecycle {
    Stopped,
    Configuring,
    Running,
    Paused,
}

struct StreamConfiguration {
    input_channel_count: usize,
    output_channel_count: usize,
    output_pair_base: Arc<AtomicUsize>,
    sample_rate: u32,
    max_frames_per_callback: usize,
}

/// Number of pending real-time-callback bounds-check overruns the render closure can
/// report before the control thread has drained them. Small: these are rare host bugs,
/// not a steady-state channel.
const OVERRUN_CHANNEL_CAPACITY: usize = 16;

struct InputChannelDrain {
    consumer: Consumer<f32>,
}

/// The concrete composite-device collaborator: one cpal input stream feeding ring
/// buffers, one cpal output stream running the render callback.
pub struct CompositeDeviceStream {
    host: cpal::Host,
    lifecycle: Mutex<StreamLifecycle>,
    configuration: Mutex<Option<StreamConfiguration>>,
    renderer_slot: Arc<ArcSwapOption<RendererState>>,
    input_stream: Mutex<Option<cpal::Stream>>,
    output_stream: Mutex<Option<cpal::Stream>>,
    overrun_monitor: Mutex<Option<Consumer<usize>>>,
}

impl CompositeDeviceStream {
    pub fn new(renderer_slot: Arc<ArcSwapOption<RendererState>>) -> Self {
        Self {
            host: cpal::default_host(),
            lifecycle: Mutex::new(StreamLifecycle::Stopped),
            configuration: Mutex::new(None),
            renderer_slot,
            input_stream: Mutex::new(None),
            output_stream: Mutex::new(None),
            overrun_monitor: Mutex::new(None),
        }
    }

    pub fn lifecycle(&self) -> StreamLifecycle {
        *self.lifecycle.lock().unwrap()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle() == StreamLifecycle::Running
    }

    /// Prepares internal buffers and opens (but does not start) the input/output streams.
    pub fn configure_stream(
        &self,
        input_channel_count: usize,
        output_channel_count: usize,
        output_pair_base: usize,
        sample_rate: u32,
        max_frames_per_callback: usize,
    ) -> Result<()> {
        if output_pair_base + 1 >= output_channel_count {
            return Err(DeviceError::InvalidConfiguration(format!(
                "output_pair_base {output_pair_base} leaves no room for a stereo pair in {output_channel_count} channels"
            )));
        }

        *self.lifecycle.lock().unwrap() = StreamLifecycle::Configuring;

        let output_pair_base = Arc::new(AtomicUsize::new(output_pair_base));

        let input_device = self
            .host
            .default_input_device()
            .ok_or_else(|| DeviceError::UnderlyingHostError("no default input device".into()))?;
        let output_device = self
            .host
            .default_output_device()
            .ok_or_else(|| DeviceError::UnderlyingHostError("no default output device".into()))?;

        let input_config = StreamConfig {
            channels: input_channel_count as u16,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(max_frames_per_callback as u32),
        };
        let output_config = StreamConfig {
            channels: output_channel_count as u16,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(max_frames_per_callback as u32),
        };

        let bridge_capacity = (max_frames_per_callback * 4).next_power_of_two();
        let mut producers: Vec<Producer<f32>> = Vec::with_capacity(input_channel_count);
        let mut drains = Vec::with_capacity(input_channel_count);
        for _ in 0..input_channel_count {
            let (producer, consumer) = SpscRingBuffer::new::<f32>(bridge_capacity);
            producers.push(producer);
            drains.push(InputChannelDrain { consumer });
        }

        let input_stream = input_device
            .build_input_stream(
                &input_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(input_channel_count) {
                        for (channel, sample) in frame.iter().enumerate() {
                            if let Some(producer) = producers.get_mut(channel) {
                                // Non-blocking: drop the sample on overflow rather than stall
                                // the input callback.
                                let _ = producer.try_push(*sample);
                            }
                        }
                    }
                },
                |err| tracing::error!(%err, "composite device input stream error"),
                None,
            )
            .map_err(|e| DeviceError::UnderlyingHostError(e.to_string()))?;

        let renderer_slot = Arc::clone(&self.renderer_slot);
        let output_pair_base_cb = Arc::clone(&output_pair_base);

        let mut in_scratch = vec![vec![0.0f32; max_frames_per_callback]; input_channel_count];
        let mut l_scratch = vec![0.0f32; max_frames_per_callback];
        let mut r_scratch = vec![0.0f32; max_frames_per_callback];

        let (mut overrun_producer, overrun_consumer) = SpscRingBuffer::new::<usize>(OVERRUN_CHANNEL_CAPACITY);

        let output_stream = output_device
            .build_output_stream(
                &output_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frame_count = data.len() / output_channel_count;
                    let pair_base = output_pair_base_cb.load(Ordering::Acquire);

                    if frame_count > max_frames_per_callback {
                        // Only the routed pair is this callback's to clear; every other
                        // output channel is routed elsewhere (e.g. a loopback driver's
                        // input side) and must be left untouched. Report the overrun for
                        // the control thread to raise, rather than logging on this thread.
                        for frame in 0..frame_count {
                            let base = frame * output_channel_count;
                            data[base + pair_base] = 0.0;
                            data[base + pair_base + 1] = 0.0;
                        }
                        let _ = overrun_producer.try_push(frame_count);
                        return;
                    }

                    for (channel, drain) in drains.iter_mut().enumerate() {
                        let out = &mut in_scratch[channel][..frame_count];
                        for sample in out.iter_mut() {
                            *sample = drain.consumer.try_pop().unwrap_or(0.0);
                        }
                    }

                    let guard = renderer_slot.load();

                    let input_refs: Vec<&[f32]> = in_scratch.iter().map(|c| &c[..frame_count]).collect();
                    match guard.as_ref() {
                        Some(state) => {
                            // SAFETY: this closure is the sole real-time thread that ever
                            // calls `renderer_mut` on the currently published state, and it
                            // never re-enters (cpal serializes callbacks for one stream).
                            let renderer: &mut Renderer = unsafe { state.renderer_mut() };
                            renderer.process(
                                &input_refs,
                                &mut l_scratch[..frame_count],
                                &mut r_scratch[..frame_count],
                                frame_count,
                            );
                        }
                        None => {
                            Renderer::passthrough(
                                &input_refs,
                                &mut l_scratch[..frame_count],
                                &mut r_scratch[..frame_count],
                                frame_count,
                            );
                        }
                    }

                    for frame in 0..frame_count {
                        let base = frame * output_channel_count;
                        data[base + pair_base] = l_scratch[frame];
                        data[base + pair_base + 1] = r_scratch[frame];
                    }
                },
                |err| tracing::error!(%err, "composite device output stream error"),
                None,
            )
            .map_err(|e| DeviceError::UnderlyingHostError(e.to_string()))?;

        *self.configuration.lock().unwrap() = Some(StreamConfiguration {
            input_channel_count,
            output_channel_count,
            output_pair_base,
            sample_rate,
            max_frames_per_callback,
        });
        *self.input_stream.lock().unwrap() = Some(input_stream);
        *self.output_stream.lock().unwrap() = Some(output_stream);
        *self.overrun_monitor.lock().unwrap() = Some(overrun_consumer);
        *self.lifecycle.lock().unwrap() = StreamLifecycle::Paused;

        Ok(())
    }

    /// Drains any real-time-callback bounds-check overruns reported since the last call,
    /// surfacing the most recent one as a [`DeviceError::RequestTooLarge`]. Control-thread
    /// only; the render callback itself only ever reports, never logs or raises.
    pub fn take_overrun(&self) -> Result<()> {
        let mut monitor = self.overrun_monitor.lock().unwrap();
        let Some(consumer) = monitor.as_mut() else {
            return Ok(());
        };
        let mut latest = None;
        while let Some(frame_count) = consumer.try_pop() {
            latest = Some(frame_count);
        }
        match latest {
            Some(frame_count) => Err(DeviceError::RequestTooLarge(format!(
                "render callback requested {frame_count} frames, exceeding the configured maximum of {max}",
                max = self
                    .configuration
                    .lock()
                    .unwrap()
                    .as_ref()
                    .map_or(frame_count, |c| c.max_frames_per_callback)
            ))),
            None => Ok(()),
        }
    }

    /// Atomically updates which output-channel pair receives the stereo mix. Callable
    /// while running without stopping the stream.
    pub fn set_output_pair(&self, output_pair_base: usize) -> Result<()> {
        let configuration = self.configuration.lock().unwrap();
        let configuration = configuration
            .as_ref()
            .ok_or_else(|| DeviceError::InvalidConfiguration("stream not configured".into()))?;
        if output_pair_base + 1 >= configuration.output_channel_count {
            return Err(DeviceError::InvalidConfiguration(format!(
                "output_pair_base {output_pair_base} leaves no room for a stereo pair in {} channels",
                configuration.output_channel_count
            )));
        }
        configuration.output_pair_base.store(output_pair_base, Ordering::Release);
        Ok(())
    }

    pub fn start(&self) -> Result<()> {
        let input = self.input_stream.lock().unwrap();
        let output = self.output_stream.lock().unwrap();
        let (Some(input), Some(output)) = (input.as_ref(), output.as_ref()) else {
            return Err(DeviceError::InvalidConfiguration("configure_stream must be called before start".into()));
        };
        input.play().map_err(|e| DeviceError::UnderlyingHostError(e.to_string()))?;
        output.play().map_err(|e| DeviceError::UnderlyingHostError(e.to_string()))?;
        *self.lifecycle.lock().unwrap() = StreamLifecycle::Running;
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        if let Some(input) = self.input_stream.lock().unwrap().as_ref() {
            input.pause().map_err(|e| DeviceError::UnderlyingHostError(e.to_string()))?;
        }
        if let Some(output) = self.output_stream.lock().unwrap().as_ref() {
            output.pause().map_err(|e| DeviceError::UnderlyingHostError(e.to_string()))?;
        }
        *self.lifecycle.lock().unwrap() = StreamLifecycle::Stopped;
        Ok(())
    }

    pub fn supports_f32(&self) -> Result<bool> {
        let device = self
            .host
            .default_output_device()
            .ok_or_else(|| DeviceError::UnderlyingHostError("no default output device".into()))?;
        let config = device.default_output_config().map_err(|e| DeviceError::UnderlyingHostError(e.to_string()))?;
        Ok(config.sample_format() == SampleFormat::F32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_stream() -> CompositeDeviceStream {
        CompositeDeviceStream::new(Arc::new(ArcSwapOption::from(None)))
    }

    #[test]
    fn starts_stopped() {
        let device = new_stream();
        assert_eq!(device.lifecycle(), StreamLifecycle::Stopped);
        assert!(!device.is_running());
    }

    #[test]
    fn configure_rejects_pair_base_without_room_for_a_stereo_pair() {
        let device = new_stream();
        let err = device.configure_stream(2, 2, 1, 48_000, 256).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidConfiguration(_)));
        assert_eq!(device.lifecycle(), StreamLifecycle::Stopped);
    }

    #[test]
    fn configure_rejects_pair_base_at_exact_channel_count() {
        let device = new_stream();
        let err = device.configure_stream(2, 6, 5, 48_000, 256).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidConfiguration(_)));
    }

    #[test]
    fn set_output_pair_before_configure_is_an_error() {
        let device = new_stream();
        let err = device.set_output_pair(0).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidConfiguration(_)));
    }

    #[test]
    fn start_before_configure_is_an_error() {
        let device = new_stream();
        let err = device.start().unwrap_err();
        assert!(matches!(err, DeviceError::InvalidConfiguration(_)));
    }

    #[test]
    fn stop_before_configure_is_a_no_op() {
        let device = new_stream();
        assert!(device.stop().is_ok());
        assert_eq!(device.lifecycle(), StreamLifecycle::Stopped);
    }

    #[test]
    fn take_overrun_before_configure_is_a_no_op() {
        let device = new_stream();
        assert!(device.take_overrun().is_ok());
    }
}

