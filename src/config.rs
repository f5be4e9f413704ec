use serde::{Deserialize, Serialize};

use crate::{Result, TonegridError};

pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 300;
pub const STEPS_PER_MEASURE: usize = 8;

/// Tunables for synthesis and sequencing. Lives for the whole process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub tone_duration_secs: f32,
    pub tone_volume: f32,
    pub drum_duration_secs: f32,
    pub drum_volume: f32,
    pub key_count: usize,
    pub max_layers: usize,
    pub default_bpm: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            tone_duration_secs: 0.4,
            tone_volume: 0.15,
            drum_duration_secs: 0.15,
            drum_volume: 0.18,
            key_count: 24,
            max_layers: 5,
            default_bpm: 120,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON override; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(TonegridError::invalid("sample_rate", self.sample_rate));
        }
        if !(self.tone_duration_secs > 0.0) {
            return Err(TonegridError::invalid(
                "tone_duration_secs",
                self.tone_duration_secs,
            ));
        }
        if !(self.drum_duration_secs > 0.0) {
            return Err(TonegridError::invalid(
                "drum_duration_secs",
                self.drum_duration_secs,
            ));
        }
        if self.max_layers == 0 {
            return Err(TonegridError::invalid("max_layers", 0.0));
        }
        validate_bpm(self.default_bpm)
    }
}

pub fn validate_bpm(bpm: u32) -> Result<()> {
    if (MIN_BPM..=MAX_BPM).contains(&bpm) {
        Ok(())
    } else {
        Err(TonegridError::invalid("bpm", bpm))
    }
}
