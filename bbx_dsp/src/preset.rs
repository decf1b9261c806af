//! Preset loader and channel mapper: turns decoded per-channel impulse-response samples
//! into a ready-to-publish [`Renderer`] plus its ILD-compensation gains.
//!
//! Grounded on `bbx_dsp/src/blocks/effectors/binaural_decoder/virtual_speaker.rs`'s
//! `layouts` module for the built-in table idiom (`hesuvi`, below), generalized from
//! azimuth-position tables to explicit channel-index tables.

use crate::channel_map::HrirChannelMap;
use crate::constants::{ILD_COMPENSATION_FACTOR, MANUAL_BALANCE_MAX_TRIM};
use crate::convolver::Convolver;
use crate::error::{Result, SpatializerError};
use crate::fft_cache::FftPlanCache;
use crate::renderer::Renderer;
use crate::state::CompensationGains;
use crate::virtual_speaker::{InputLayout, VirtualSpeaker};

/// Built-in fixed channel maps for common HRIR file conventions that aren't simple
/// interleaved pairs, analogous in spirit to `bbx_dsp`'s existing named speaker-position
/// tables.
pub mod hesuvi {
    use crate::virtual_speaker::VirtualSpeaker::{self, *};

    /// 7-channel HeSuVi layout: one IR channel per speaker, side speakers sharing a
    /// merged surround channel, each channel carrying only one ear — paired with its
    /// mirror channel 7 apart by convention. Table entries are `(speaker, left, right)`.
    pub const SEVEN_CHANNEL: &[(VirtualSpeaker, usize, usize)] =
        &[(FrontLeft, 0, 7), (FrontRight, 1, 8), (FrontCenter, 2, 9), (BackLeft, 4, 11), (BackRight, 5, 12)];

    /// 14-channel HeSuVi layout: already split-block (each speaker's two ears are 7
    /// channels apart), one pair per 7.1 speaker position that actually carries an HRIR.
    /// LFE has no entry, same as [`SEVEN_CHANNEL`] above: it needs no HRTF, so the format
    /// only ever carries 7 spatialized positions (FL, FR, FC, BL, BR, SL, SR) split
    /// across 14 channels, not 8.
    pub const FOURTEEN_CHANNEL: &[(VirtualSpeaker, usize, usize)] = &[
        (FrontLeft, 0, 7),
        (FrontRight, 1, 8),
        (FrontCenter, 2, 9),
        (BackLeft, 3, 10),
        (BackRight, 4, 11),
        (SideLeft, 5, 12),
        (SideRight, 6, 13),
    ];
}

/// Resolves a channel map when the caller didn't supply one explicitly: interleaved pairs
/// if the channel count matches, else one of the documented HeSuVi tables, else an error.
pub fn resolve_channel_map(layout: &InputLayout, file_channel_count: usize) -> Result<HrirChannelMap> {
    if let Some(map) = HrirChannelMap::infer(layout, file_channel_count) {
        return Ok(map);
    }
    match file_channel_count {
        7 => Ok(HrirChannelMap::from_table(hesuvi::SEVEN_CHANNEL)),
        14 => Ok(HrirChannelMap::from_table(hesuvi::FOURTEEN_CHANNEL)),
        _ => Err(SpatializerError::UnsupportedChannelCount { found: file_channel_count, minimum: 2 }),
    }
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn ild_db(to_left_ear: &[f32], to_right_ear: &[f32]) -> f64 {
    let left = rms(to_left_ear).max(f64::EPSILON);
    let right = rms(to_right_ear).max(f64::EPSILON);
    20.0 * (left / right).log10()
}

/// Derives the energy-preserving ILD-compensation gains from the front-left/front-right
/// IR pairs, testing both ear-index hypotheses and picking whichever makes the two
/// speakers' ILDs mirror images of each other.
pub fn derive_compensation_gains(
    fl_left: &[f32],
    fl_right: &[f32],
    fr_left: &[f32],
    fr_right: &[f32],
    compensation_enabled: bool,
    manual_balance: f32,
) -> CompensationGains {
    if !compensation_enabled {
        return apply_manual_balance(CompensationGains::UNITY, manual_balance);
    }

    let ild_fl = ild_db(fl_left, fl_right);
    let straight_ild_fr = ild_db(fr_left, fr_right);
    let swapped_ild_fr = ild_db(fr_right, fr_left);

    let ild_fr = if (straight_ild_fr + ild_fl).abs() <= (swapped_ild_fr + ild_fl).abs() {
        straight_ild_fr
    } else {
        swapped_ild_fr
    };

    let asymmetry = ild_fr.abs() - ild_fl.abs();
    let compensation_db = asymmetry * ILD_COMPENSATION_FACTOR;
    let ratio = 10f64.powf(compensation_db / 20.0);
    let gains = CompensationGains { left: ratio.sqrt() as f32, right: (1.0 / ratio.sqrt()) as f32 };
    apply_manual_balance(gains, manual_balance)
}

fn apply_manual_balance(gains: CompensationGains, manual_balance: f32) -> CompensationGains {
    let balance = manual_balance.clamp(-1.0, 1.0);
    let trim = balance * MANUAL_BALANCE_MAX_TRIM;
    CompensationGains { left: gains.left * (1.0 - trim.max(0.0)), right: gains.right * (1.0 + trim.min(0.0)) }
}

/// Builds a [`Renderer`] and its compensation gains from already-decoded IR channel data
/// (one `Vec<f32>` per file channel, already resampled to the target rate by `bbx_file`).
pub fn build_renderer(
    ir_channels: &[Vec<f32>],
    layout: &InputLayout,
    map: &HrirChannelMap,
    block_size: usize,
    compensation_enabled: bool,
    manual_balance: f32,
    plan_cache: &FftPlanCache,
) -> Result<(Renderer, CompensationGains)> {
    map.validate(layout, ir_channels.len())?;

    let mut speakers = Vec::with_capacity(layout.len());
    for &speaker in layout.speakers() {
        let (left_idx, right_idx) = map.get(speaker).expect("validated above");
        let convolver_l = Convolver::new(&ir_channels[left_idx], block_size, plan_cache)
            .map_err(|e| SpatializerError::ConvolverSetupFailed(format!("{speaker}: {e}")))?;
        let convolver_r = Convolver::new(&ir_channels[right_idx], block_size, plan_cache)
            .map_err(|e| SpatializerError::ConvolverSetupFailed(format!("{speaker}: {e}")))?;
        speakers.push((speaker, convolver_l, convolver_r));
    }

    let gains = match (map.get(VirtualSpeaker::FrontLeft), map.get(VirtualSpeaker::FrontRight)) {
        (Some((fl_l, fl_r)), Some((fr_l, fr_r))) => derive_compensation_gains(
            &ir_channels[fl_l],
            &ir_channels[fl_r],
            &ir_channels[fr_l],
            &ir_channels[fr_r],
            compensation_enabled,
            manual_balance,
        ),
        _ => apply_manual_balance(CompensationGains::UNITY, manual_balance),
    };

    let renderer = Renderer::new(speakers, block_size, gains.left, gains.right)?;
    tracing::info!(
        speaker_count = renderer.speaker_count(),
        gain_l = gains.left,
        gain_r = gains.right,
        "renderer built from preset"
    );
    Ok((renderer, gains))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len).map(|i| amplitude * (i as f32 * 0.1).sin()).collect()
    }

    #[test]
    fn compensation_disabled_yields_unity_gains() {
        let gains = derive_compensation_gains(&tone(64, 1.0), &tone(64, 0.2), &tone(64, 0.2), &tone(64, 1.0), false, 0.0);
        assert_eq!(gains, CompensationGains::UNITY);
    }

    #[test]
    fn compensation_is_energy_preserving() {
        let gains = derive_compensation_gains(&tone(64, 1.0), &tone(64, 0.3), &tone(64, 0.3), &tone(64, 1.0), true, 0.0);
        let energy = gains.left * gains.left + gains.right * gains.right;
        assert!((energy - 2.0).abs() < 1e-3, "energy = {energy}");
    }

    #[test]
    fn manual_balance_trims_left_and_right_oppositely() {
        let full_left = apply_manual_balance(CompensationGains::UNITY, -1.0);
        let full_right = apply_manual_balance(CompensationGains::UNITY, 1.0);
        assert!(full_left.left < 1.0);
        assert_eq!(full_left.right, 1.0);
        assert!(full_right.right > 1.0);
        assert_eq!(full_right.left, 1.0);
    }

    #[test]
    fn resolve_channel_map_prefers_interleaved_when_it_fits() {
        let layout = InputLayout::stereo();
        let map = resolve_channel_map(&layout, 4).unwrap();
        assert_eq!(map.get(VirtualSpeaker::FrontLeft), Some((0, 1)));
    }

    #[test]
    fn resolve_channel_map_falls_back_to_hesuvi_fourteen_channel() {
        let layout = InputLayout::surround_7_1();
        let map = resolve_channel_map(&layout, 14).unwrap();
        assert_eq!(map.get(VirtualSpeaker::SideLeft), Some((5, 12)));
        assert_eq!(map.get(VirtualSpeaker::SideRight), Some((6, 13)));
    }

    #[test]
    fn resolve_channel_map_rejects_unrecognized_channel_count() {
        let layout = InputLayout::stereo();
        assert!(resolve_channel_map(&layout, 5).is_err());
    }

    #[test]
    fn build_renderer_rejects_invalid_map() {
        let cache = FftPlanCache::new();
        let layout = InputLayout::surround_5_1();
        let map = HrirChannelMap::interleaved_pairs(&InputLayout::stereo());
        let ir_channels = vec![tone(64, 1.0); 4];
        let result = build_renderer(&ir_channels, &layout, &map, 64, true, 0.0, &cache);
        assert!(result.is_err());
    }

    #[test]
    fn build_renderer_succeeds_for_well_formed_stereo_preset() {
        let cache = FftPlanCache::new();
        let layout = InputLayout::stereo();
        let map = HrirChannelMap::interleaved_pairs(&layout);
        let ir_channels = vec![tone(64, 1.0), tone(64, 0.5), tone(64, 0.5), tone(64, 1.0)];
        let (renderer, _gains) = build_renderer(&ir_channels, &layout, &map, 64, true, 0.0, &cache).unwrap();
        assert_eq!(renderer.speaker_count(), 2);
    }
}
