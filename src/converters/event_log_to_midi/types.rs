//! Settings and results for event log → MIDI conversion

use serde::{Deserialize, Serialize};

use super::{ConvertError, Result};
use crate::timeline::defaults::{
    DEFAULT_NOTE_DURATION, DEFAULT_PPQ, DEFAULT_TEMPO_US_PER_BEAT, DEFAULT_TICK_DIVISOR,
};
use crate::timeline::Timeline;

/// Conversion settings. Every field has a default, so a partial JSON
/// document such as `{"ppq": 960}` is valid.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionSettings {
    /// Ticks per quarter note of the written file
    pub ppq: u16,
    /// Length of every note, in seconds
    pub note_duration: f64,
    /// Log ticks per second
    pub tick_divisor: f64,
    /// Tempo used when the log has none, in microseconds per beat
    pub default_tempo: u32,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            ppq: DEFAULT_PPQ,
            note_duration: DEFAULT_NOTE_DURATION,
            tick_divisor: DEFAULT_TICK_DIVISOR,
            default_tempo: DEFAULT_TEMPO_US_PER_BEAT,
        }
    }
}

impl ConversionSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| ConvertError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ppq == 0 || self.ppq > 0x7FFF {
            return Err(ConvertError::Settings(format!(
                "ppq must be between 1 and 32767, got {}",
                self.ppq
            )));
        }
        if !(self.tick_divisor.is_finite() && self.tick_divisor > 0.0) {
            return Err(ConvertError::Settings(format!(
                "tickDivisor must be positive, got {}",
                self.tick_divisor
            )));
        }
        if !(self.note_duration.is_finite() && self.note_duration >= 0.0) {
            return Err(ConvertError::Settings(format!(
                "noteDuration must not be negative, got {}",
                self.note_duration
            )));
        }
        if self.default_tempo == 0 {
            return Err(ConvertError::Settings("defaultTempo must not be zero".to_string()));
        }
        Ok(())
    }
}

/// Output of a full conversion: the normalized stream and the file bytes.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub timeline: Timeline,
    pub midi: Vec<u8>,
}

impl Conversion {
    pub fn summary(&self) -> ConversionSummary {
        ConversionSummary::new(&self.timeline)
    }
}

/// Console-facing statistics about a conversion.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    pub tracks: usize,
    /// Seconds
    pub duration: f64,
    pub bpm: u32,
    pub notes_per_track: Vec<usize>,
}

impl ConversionSummary {
    pub fn new(timeline: &Timeline) -> Self {
        Self {
            // One performance track; the conductor track is not counted
            tracks: 1,
            duration: timeline.duration(),
            bpm: timeline.bpm,
            notes_per_track: vec![timeline.note_count],
        }
    }
}
