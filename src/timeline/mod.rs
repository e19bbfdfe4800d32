//! Timeline reconstruction module
//!
//! Turns the delta-timed events of a log into an absolute, normalized
//! stream ready for MIDI export.
//!
//! # Usage
//! ```rust
//! use midilog::parse::parse_event_log;
//! use midilog::timeline::build_timeline;
//! use midilog::converters::event_log_to_midi::ConversionSettings;
//!
//! let events = parse_event_log("Message::NOTE_ON(NoteOn { channel: 0, note: 60, velocity: 100, time: 0 })");
//! let timeline = build_timeline(&events, &ConversionSettings::default());
//! assert_eq!(timeline.note_count, 1);
//! ```

pub mod builder;
pub mod defaults;
pub mod model;

// Re-export main entry points
pub use builder::{build_timeline, TimelineBuilder, TimelineState};
pub use defaults::{bpm_from_tempo, DEFAULT_PPQ, DEFAULT_TEMPO_BPM, DEFAULT_TEMPO_US_PER_BEAT};
pub use model::*;
