//! Session configuration: the on-disk JSON shape the external settings collaborator
//! writes and replays, and the active-preset metadata it references.
//!
//! Grounded on `bbx_dsp::config::GraphConfig`'s `serde::Deserialize`-derived root struct
//! and its per-field doc-comment density; this config is flatter since the spatializer
//! core has no block graph to describe, only device/session/preset parameters.

use std::path::{Path, PathBuf};

use bbx_dsp::virtual_speaker::{InputLayout, VirtualSpeaker};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read session config at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse session config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Either a named standard layout or an explicit ordered list of speaker tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum InputLayoutConfig {
    Named(String),
    Explicit(Vec<String>),
}

impl InputLayoutConfig {
    /// Resolves this config value into an [`InputLayout`]. `Named` values are matched
    /// case-insensitively against `"stereo"`, `"5.1"`, `"7.1"`, and `"7.1.4"`.
    pub fn resolve(&self) -> Option<InputLayout> {
        match self {
            InputLayoutConfig::Named(name) => match name.to_lowercase().as_str() {
                "stereo" => Some(InputLayout::stereo()),
                "5.1" | "surround_5_1" => Some(InputLayout::surround_5_1()),
                "7.1" | "surround_7_1" => Some(InputLayout::surround_7_1()),
                "7.1.4" | "surround_7_1_4" => Some(InputLayout::surround_7_1_4()),
                _ => None,
            },
            InputLayoutConfig::Explicit(tags) => {
                Some(InputLayout::new(tags.iter().map(|tag| VirtualSpeaker::from_tag(tag)).collect()))
            }
        }
    }
}

/// Wire form of a preset's identifying and decode-relevant metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresetConfig {
    pub id: String,
    pub display_name: String,
    pub file_path: PathBuf,
    pub channel_count: usize,
    pub native_sample_rate: u32,
}

/// Root session configuration, parsed once at host startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub device_name: Option<String>,
    pub sample_rate: u32,
    pub max_frames_per_callback: usize,
    #[serde(default)]
    pub output_pair_base: usize,
    pub input_layout: InputLayoutConfig,
    #[serde(default)]
    pub active_preset: Option<PresetConfig>,
    #[serde(default = "default_compensation_enabled")]
    pub compensation_enabled: bool,
    #[serde(default)]
    pub manual_balance: f32,
}

fn default_compensation_enabled() -> bool {
    true
}

impl SessionConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
    }
}
