//! Normalized, time-stamped event stream
//!
//! This is what the timeline builder hands to the MIDI writer: every
//! playable or meta event stamped with its absolute tick and its time in
//! seconds, plus the resolved global tempo.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// Global tempo resolved from the first tempo event
    pub bpm: u32,
    pub microseconds_per_beat: u32,
    /// Resolution declared by the log header, if any
    pub ticks_per_beat: Option<u16>,
    pub note_count: usize,
    pub events: Vec<TimedEvent>,
}

impl Timeline {
    pub fn notes(&self) -> impl Iterator<Item = (&TimedEvent, &NoteData)> {
        self.events.iter().filter_map(|event| match &event.payload {
            TimedPayload::Note(note) => Some((event, note)),
            _ => None,
        })
    }

    /// End of the last sounding note or last stamped event, in seconds.
    pub fn duration(&self) -> f64 {
        self.events
            .iter()
            .map(|event| match &event.payload {
                TimedPayload::Note(note) => event.time + note.duration,
                _ => event.time,
            })
            .fold(0.0, f64::max)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimedEvent {
    /// Absolute clock in log ticks
    pub tick: u64,
    /// Absolute time in seconds
    pub time: f64,
    #[serde(flatten)]
    pub payload: TimedPayload,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteData {
    pub channel: u8,
    pub note_number: u8,
    /// Velocity normalized to 0.0–1.0
    pub velocity: f64,
    /// Seconds
    pub duration: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimedPayload {
    Note(NoteData),
    #[serde(rename_all = "camelCase")]
    Tempo { microseconds_per_beat: u32, bpm: u32 },
    TimeSignature { numerator: u8, denominator: u8 },
    #[serde(rename_all = "camelCase")]
    ControlChange { channel: u8, controller_type: u8, value: u8 },
    PitchWheel { channel: u8, value: i16 },
    AfterTouch { channel: u8, value: u8 },
    #[serde(rename_all = "camelCase")]
    PolyTouch { channel: u8, note_number: u8, value: u8 },
    #[serde(rename_all = "camelCase")]
    ProgramChange { channel: u8, program_number: u8 },
    SystemExclusive { data: Vec<u8> },
}
