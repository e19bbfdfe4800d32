//! Typed event records parsed from an event log
//!
//! One [`Event`] per recognized log line. The payload is a closed set of
//! variants, one per tag, and each variant carries exactly the fields that
//! are meaningful for that kind.

use serde::{Deserialize, Serialize};

/// The eleven event kinds the log can carry.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Header,
    NoteOn,
    NoteOff,
    SetTempo,
    TimeSignature,
    ControlChange,
    PitchWheel,
    AfterTouch,
    PolyTouch,
    ProgramChange,
    SystemExclusive,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        EventKind::Header,
        EventKind::NoteOn,
        EventKind::NoteOff,
        EventKind::SetTempo,
        EventKind::TimeSignature,
        EventKind::ControlChange,
        EventKind::PitchWheel,
        EventKind::AfterTouch,
        EventKind::PolyTouch,
        EventKind::ProgramChange,
        EventKind::SystemExclusive,
    ];

    /// Look up a kind by its log tag (`NOTE_ON`, `SET_TEMPO`, ...).
    /// Matching is case-sensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "HEADER" => EventKind::Header,
            "NOTE_ON" => EventKind::NoteOn,
            "NOTE_OFF" => EventKind::NoteOff,
            "SET_TEMPO" => EventKind::SetTempo,
            "TIME_SIGNATURE" => EventKind::TimeSignature,
            "CONTROL_CHANGE" => EventKind::ControlChange,
            "PITCH_WHEEL" => EventKind::PitchWheel,
            "AFTER_TOUCH" => EventKind::AfterTouch,
            "POLY_TOUCH" => EventKind::PolyTouch,
            "PROGRAM_CHANGE" => EventKind::ProgramChange,
            "SYSTEM_EXCLUSIVE" => EventKind::SystemExclusive,
            _ => return None,
        };
        Some(kind)
    }

    /// Writer-facing event name: the tag in lower camel case
    /// (`SET_TEMPO` → `setTempo`).
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Header => "header",
            EventKind::NoteOn => "noteOn",
            EventKind::NoteOff => "noteOff",
            EventKind::SetTempo => "setTempo",
            EventKind::TimeSignature => "timeSignature",
            EventKind::ControlChange => "controlChange",
            EventKind::PitchWheel => "pitchWheel",
            EventKind::AfterTouch => "afterTouch",
            EventKind::PolyTouch => "polyTouch",
            EventKind::ProgramChange => "programChange",
            EventKind::SystemExclusive => "systemExclusive",
        }
    }

    /// Header, tempo and meter events describe the stream rather than play.
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            EventKind::Header | EventKind::SetTempo | EventKind::TimeSignature
        )
    }
}

/// Per-kind payload of an event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    #[serde(rename_all = "camelCase")]
    Header { ticks_per_beat: u16 },
    #[serde(rename_all = "camelCase")]
    NoteOn { channel: u8, note_number: u8, velocity: u8 },
    #[serde(rename_all = "camelCase")]
    NoteOff { channel: u8, note_number: u8, velocity: u8 },
    #[serde(rename_all = "camelCase")]
    SetTempo { microseconds_per_beat: u32 },
    TimeSignature { numerator: u8, denominator: u8 },
    #[serde(rename_all = "camelCase")]
    ControlChange { channel: u8, controller_type: u8, value: u8 },
    /// `value` is a signed offset from the wheel center.
    PitchWheel { channel: u8, value: i16 },
    AfterTouch { channel: u8, value: u8 },
    #[serde(rename_all = "camelCase")]
    PolyTouch { channel: u8, note_number: u8, value: u8 },
    #[serde(rename_all = "camelCase")]
    ProgramChange { channel: u8, program_number: u8 },
    SystemExclusive { data: Vec<u8> },
}

impl Message {
    pub fn kind(&self) -> EventKind {
        match self {
            Message::Header { .. } => EventKind::Header,
            Message::NoteOn { .. } => EventKind::NoteOn,
            Message::NoteOff { .. } => EventKind::NoteOff,
            Message::SetTempo { .. } => EventKind::SetTempo,
            Message::TimeSignature { .. } => EventKind::TimeSignature,
            Message::ControlChange { .. } => EventKind::ControlChange,
            Message::PitchWheel { .. } => EventKind::PitchWheel,
            Message::AfterTouch { .. } => EventKind::AfterTouch,
            Message::PolyTouch { .. } => EventKind::PolyTouch,
            Message::ProgramChange { .. } => EventKind::ProgramChange,
            Message::SystemExclusive { .. } => EventKind::SystemExclusive,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One parsed log line.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(flatten)]
    pub message: Message,
    /// Ticks since the previous event. `None` only for a tempo event whose
    /// time was absent; such an event does not move the clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_time: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub meta: bool,
}

impl Event {
    pub fn new(message: Message, delta_time: Option<u32>) -> Self {
        let meta = message.kind().is_meta();
        Self {
            message,
            delta_time,
            meta,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.message.kind()
    }

    /// Ticks this event moves the clock by.
    pub fn delta_ticks(&self) -> u64 {
        self.delta_time.map_or(0, u64::from)
    }
}
