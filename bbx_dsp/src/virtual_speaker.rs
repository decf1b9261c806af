//! Virtual speaker tags and standard input layouts.
//!
//! Grounded on the positional-table idiom of
//! `blocks/effectors/binaural_decoder/virtual_speaker.rs`'s `layouts` module (reused here
//! as a closed enum rather than azimuth tuples, to line up with explicit channel-index maps).

use std::fmt;

/// A labelled direction from which a given input channel's signal should appear to
/// originate, once convolved with its (L-ear, R-ear) HRIR pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualSpeaker {
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequencyEffects,
    BackLeft,
    BackRight,
    SideLeft,
    SideRight,
    TopFrontLeft,
    TopFrontRight,
    TopBackLeft,
    TopBackRight,
    /// Escape hatch for non-standard speaker tags carried through from a custom map.
    Custom(&'static str),
}

impl VirtualSpeaker {
    /// Short tag matching common HRIR-file channel naming conventions (HeSuVi, etc.).
    pub fn tag(self) -> &'static str {
        match self {
            VirtualSpeaker::FrontLeft => "FL",
            VirtualSpeaker::FrontRight => "FR",
            VirtualSpeaker::FrontCenter => "FC",
            VirtualSpeaker::LowFrequencyEffects => "LFE",
            VirtualSpeaker::BackLeft => "BL",
            VirtualSpeaker::BackRight => "BR",
            VirtualSpeaker::SideLeft => "SL",
            VirtualSpeaker::SideRight => "SR",
            VirtualSpeaker::TopFrontLeft => "TFL",
            VirtualSpeaker::TopFrontRight => "TFR",
            VirtualSpeaker::TopBackLeft => "TBL",
            VirtualSpeaker::TopBackRight => "TBR",
            VirtualSpeaker::Custom(name) => name,
        }
    }

    /// Inverse of [`VirtualSpeaker::tag`], for parsing speaker names out of configuration.
    /// Unrecognized tags become `Custom`, leaking the string once to get a `&'static str` —
    /// acceptable since this only ever runs at control-thread startup, never per block.
    pub fn from_tag(tag: &str) -> VirtualSpeaker {
        match tag {
            "FL" => VirtualSpeaker::FrontLeft,
            "FR" => VirtualSpeaker::FrontRight,
            "FC" => VirtualSpeaker::FrontCenter,
            "LFE" => VirtualSpeaker::LowFrequencyEffects,
            "BL" => VirtualSpeaker::BackLeft,
            "BR" => VirtualSpeaker::BackRight,
            "SL" => VirtualSpeaker::SideLeft,
            "SR" => VirtualSpeaker::SideRight,
            "TFL" => VirtualSpeaker::TopFrontLeft,
            "TFR" => VirtualSpeaker::TopFrontRight,
            "TBL" => VirtualSpeaker::TopBackLeft,
            "TBR" => VirtualSpeaker::TopBackRight,
            other => VirtualSpeaker::Custom(Box::leak(other.to_string().into_boxed_str())),
        }
    }
}

impl fmt::Display for VirtualSpeaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// An ordered sequence of `VirtualSpeaker`s describing what each input channel represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayout {
    speakers: Vec<VirtualSpeaker>,
}

impl InputLayout {
    pub fn new(speakers: Vec<VirtualSpeaker>) -> Self {
        Self { speakers }
    }

    pub fn stereo() -> Self {
        use VirtualSpeaker::*;
        Self::new(vec![FrontLeft, FrontRight])
    }

    pub fn surround_5_1() -> Self {
        use VirtualSpeaker::*;
        Self::new(vec![FrontLeft, FrontRight, FrontCenter, LowFrequencyEffects, BackLeft, BackRight])
    }

    pub fn surround_7_1() -> Self {
        use VirtualSpeaker::*;
        Self::new(vec![
            FrontLeft, FrontRight, FrontCenter, LowFrequencyEffects, BackLeft, BackRight, SideLeft, SideRight,
        ])
    }

    pub fn surround_7_1_4() -> Self {
        use VirtualSpeaker::*;
        let mut speakers = Self::surround_7_1().speakers;
        speakers.extend([TopFrontLeft, TopFrontRight, TopBackLeft, TopBackRight]);
        Self::new(speakers)
    }

    /// Derives a standard layout from an input channel count. Returns `None` for channel
    /// counts with no standard layout (the caller is expected to supply an explicit
    /// `InputLayout` in that case).
    pub fn from_channel_count(channel_count: usize) -> Option<Self> {
        match channel_count {
            2 => Some(Self::stereo()),
            6 => Some(Self::surround_5_1()),
            8 => Some(Self::surround_7_1()),
            12 => Some(Self::surround_7_1_4()),
            _ => None,
        }
    }

    pub fn speakers(&self) -> &[VirtualSpeaker] {
        &self.speakers
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    pub fn index_of(&self, speaker: VirtualSpeaker) -> Option<usize> {
        self.speakers.iter().position(|&s| s == speaker)
    }
}
