//! Default values for timeline reconstruction and MIDI export
//!
//! Provides the fallback tempo, output resolution and the fixed
//! note length used when the log says nothing better.

/// Fallback tempo in microseconds per beat (120 BPM)
pub const DEFAULT_TEMPO_US_PER_BEAT: u32 = 500_000;

/// Fallback tempo in beats per minute
pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// Microseconds in one minute, for µs/beat ↔ BPM conversion
pub const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

/// Length given to every note, in seconds
pub const DEFAULT_NOTE_DURATION: f64 = 0.5;

/// Log ticks per output second (ticks are read as milliseconds)
pub const DEFAULT_TICK_DIVISOR: f64 = 1000.0;

/// Ticks per quarter note of the written file
/// 480 is standard and provides good resolution
pub const DEFAULT_PPQ: u16 = 480;

/// Highest velocity, used to normalize into 0.0–1.0
pub const MAX_VELOCITY: f64 = 127.0;

/// Convert a tempo in microseconds per beat to whole beats per minute.
///
/// A zero tempo has no meaningful BPM and falls back to the default.
pub fn bpm_from_tempo(microseconds_per_beat: u32) -> u32 {
    if microseconds_per_beat == 0 {
        return DEFAULT_TEMPO_BPM;
    }
    (MICROSECONDS_PER_MINUTE / microseconds_per_beat as f64).round() as u32
}
