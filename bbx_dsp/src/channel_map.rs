//! HRIR channel map: assigns each `VirtualSpeaker` a pair of (left-ear, right-ear)
//! indices into a multi-channel impulse-response file.
//!
//! Grounded on the named-table idiom of
//! `blocks/effectors/binaural_decoder/virtual_speaker.rs`'s `layouts` module, generalized
//! from azimuth positions to explicit channel-index pairs.

use std::collections::HashMap;

use crate::error::{Result, SpatializerError};
use crate::virtual_speaker::{InputLayout, VirtualSpeaker};

/// A mapping from `VirtualSpeaker` to (left_ear_index, right_ear_index) within an HRIR file.
#[derive(Debug, Clone, Default)]
pub struct HrirChannelMap {
    entries: HashMap<VirtualSpeaker, (usize, usize)>,
}

impl HrirChannelMap {
    /// Speaker `i` uses IR channels `2i` and `2i+1`.
    pub fn interleaved_pairs(layout: &InputLayout) -> Self {
        let entries = layout
            .speakers()
            .iter()
            .enumerate()
            .map(|(i, &speaker)| (speaker, (2 * i, 2 * i + 1)))
            .collect();
        Self { entries }
    }

    /// Speaker `i` uses IR channels `i` and `i+N`, where `N` is the layout length.
    pub fn split_blocks(layout: &InputLayout) -> Self {
        let n = layout.len();
        let entries = layout.speakers().iter().enumerate().map(|(i, &speaker)| (speaker, (i, i + n))).collect();
        Self { entries }
    }

    /// Builds a map from an explicit `(speaker, left, right)` table, as used by the
    /// built-in HeSuVi tables in [`crate::preset::hesuvi`].
    pub fn from_table(table: &[(VirtualSpeaker, usize, usize)]) -> Self {
        let entries = table.iter().map(|&(speaker, l, r)| (speaker, (l, r))).collect();
        Self { entries }
    }

    /// Infers a map by convention: interleaved pairs if the file has exactly
    /// `2 * layout.len()` channels, otherwise `None` (caller should fall back to a
    /// documented built-in table or reject with `UnsupportedChannelCount`).
    pub fn infer(layout: &InputLayout, file_channel_count: usize) -> Option<Self> {
        if file_channel_count == 2 * layout.len() {
            Some(Self::interleaved_pairs(layout))
        } else {
            None
        }
    }

    /// Validates that every speaker in `layout` is present with both indices within
    /// `[0, file_channel_count)` and distinct.
    pub fn validate(&self, layout: &InputLayout, file_channel_count: usize) -> Result<()> {
        for &speaker in layout.speakers() {
            let Some(&(left, right)) = self.entries.get(&speaker) else {
                return Err(SpatializerError::InvalidChannelMapping(format!(
                    "speaker {speaker} has no entry in the channel map"
                )));
            };
            if left >= file_channel_count || right >= file_channel_count {
                return Err(SpatializerError::InvalidChannelMapping(format!(
                    "speaker {speaker} maps to ({left}, {right}), outside file channel count {file_channel_count}"
                )));
            }
            if left == right {
                return Err(SpatializerError::InvalidChannelMapping(format!(
                    "speaker {speaker} maps left and right ear to the same channel ({left})"
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, speaker: VirtualSpeaker) -> Option<(usize, usize)> {
        self.entries.get(&speaker).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_pairs_assigns_adjacent_channels() {
        let layout = InputLayout::stereo();
        let map = HrirChannelMap::interleaved_pairs(&layout);
        assert_eq!(map.get(VirtualSpeaker::FrontLeft), Some((0, 1)));
        assert_eq!(map.get(VirtualSpeaker::FrontRight), Some((2, 3)));
    }

    #[test]
    fn split_blocks_assigns_offset_channels() {
        let layout = InputLayout::stereo();
        let map = HrirChannelMap::split_blocks(&layout);
        assert_eq!(map.get(VirtualSpeaker::FrontLeft), Some((0, 2)));
        assert_eq!(map.get(VirtualSpeaker::FrontRight), Some((1, 3)));
    }

    #[test]
    fn infer_picks_interleaved_when_channel_count_matches() {
        let layout = InputLayout::stereo();
        let map = HrirChannelMap::infer(&layout, 4).unwrap();
        assert_eq!(map.get(VirtualSpeaker::FrontLeft), Some((0, 1)));
        assert!(HrirChannelMap::infer(&layout, 7).is_none());
    }

    #[test]
    fn validate_rejects_missing_speaker() {
        let layout = InputLayout::surround_5_1();
        let map = HrirChannelMap::interleaved_pairs(&InputLayout::stereo());
        assert!(map.validate(&layout, 12).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let layout = InputLayout::stereo();
        let map = HrirChannelMap::interleaved_pairs(&layout);
        assert!(map.validate(&layout, 3).is_err());
    }

    #[test]
    fn validate_accepts_well_formed_map() {
        let layout = InputLayout::stereo();
        let map = HrirChannelMap::interleaved_pairs(&layout);
        assert!(map.validate(&layout, 4).is_ok());
    }
}
