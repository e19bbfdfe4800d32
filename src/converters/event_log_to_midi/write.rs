use crate::converters::event_log_to_midi::{ConversionSettings, ConvertError, Result};
use crate::timeline::{TimedPayload, Timeline};
use midly::num::{u14, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

/// Write a timeline to a Standard MIDI File (SMF) Format 1
pub fn write_smf(timeline: &Timeline, settings: &ConversionSettings, out: &mut Vec<u8>) -> Result<()> {
    let tempo_map = tempo_changes(timeline);
    let clock = TickClock::new(timeline.microseconds_per_beat.min(MAX_TEMPO), settings.ppq, &tempo_map);

    // SysEx bodies are borrowed by the track, so they are built up front
    let sysex: Vec<Vec<u8>> = timeline
        .events
        .iter()
        .filter_map(|event| match &event.payload {
            TimedPayload::SystemExclusive { data } => Some(sysex_body(data)),
            _ => None,
        })
        .collect();

    let tracks = vec![
        // Track 0: Tempo and time signature map
        build_conductor_track(timeline, &clock, &tempo_map),
        // Track 1: Everything that plays
        build_performance_track(timeline, &clock, &sysex),
    ];

    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(settings.ppq.into()),
    };

    let smf = Smf { header, tracks };

    smf.write(out)
        .map_err(|e| ConvertError::Midi(format!("Failed to write MIDI: {}", e)))?;

    Ok(())
}

/// Largest absolute tick a variable-length quantity can hold
const MAX_TICK: u32 = 0x0FFF_FFFF;

/// Largest tempo a tempo meta event can hold
const MAX_TEMPO: u32 = 0xFF_FFFF;

/// Tempo changes after the global tempo, as (seconds, microseconds per
/// beat). Markers that repeat the tempo in force are left out.
fn tempo_changes(timeline: &Timeline) -> Vec<(f64, u32)> {
    let mut tempo_in_force = timeline.microseconds_per_beat.min(MAX_TEMPO);
    let mut changes = Vec::new();
    for event in &timeline.events {
        if let TimedPayload::Tempo { microseconds_per_beat, .. } = event.payload {
            let tempo = microseconds_per_beat.min(MAX_TEMPO);
            if tempo != tempo_in_force {
                tempo_in_force = tempo;
                changes.push((event.time, tempo));
            }
        }
    }
    changes
}

/// Seconds → file ticks through the tempo map.
///
/// Each segment starts at a tempo change and counts ticks at its own
/// tempo, so an event sounds at its stamped time whatever tempo is in force.
#[derive(Debug, Clone)]
struct TickClock {
    /// (start in seconds, ticks at start, ticks per second)
    segments: Vec<(f64, f64, f64)>,
}

impl TickClock {
    fn new(global_tempo: u32, ppq: u16, changes: &[(f64, u32)]) -> Self {
        let ppq = f64::from(ppq);
        let mut clock = Self {
            segments: vec![(0.0, 0.0, ticks_per_second(global_tempo, ppq))],
        };
        for &(time, tempo) in changes {
            let start = clock.raw_ticks(time);
            let rate = ticks_per_second(tempo, ppq);
            clock.segments.push((time, start, rate));
        }
        clock
    }

    fn raw_ticks(&self, seconds: f64) -> f64 {
        let index = self
            .segments
            .partition_point(|&(start, _, _)| start <= seconds)
            .saturating_sub(1);
        match self.segments.get(index) {
            Some(&(start, base, rate)) => base + (seconds - start).max(0.0) * rate,
            None => 0.0,
        }
    }

    fn ticks(&self, seconds: f64) -> u28 {
        let ticks = self.raw_ticks(seconds).round().clamp(0.0, MAX_TICK as f64);
        (ticks as u32).into()
    }
}

fn ticks_per_second(microseconds_per_beat: u32, ppq: f64) -> f64 {
    1_000_000.0 / f64::from(microseconds_per_beat.max(1)) * ppq
}

fn build_conductor_track<'a>(
    timeline: &Timeline,
    clock: &TickClock,
    tempo_map: &[(f64, u32)],
) -> Track<'a> {
    let mut events = Vec::new();

    // Global tempo first
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(
            timeline.microseconds_per_beat.min(MAX_TEMPO).into(),
        )),
    });

    for &(time, tempo) in tempo_map {
        events.push(TrackEvent {
            delta: clock.ticks(time),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo.into())),
        });
    }

    for event in &timeline.events {
        if let TimedPayload::TimeSignature { numerator, denominator } = event.payload {
            events.push(TrackEvent {
                delta: clock.ticks(event.time),
                kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                    numerator,
                    denominator_power(denominator),
                    24, // MIDI clocks per metronome click
                    8,  // 32nd notes per quarter note
                )),
            });
        }
    }

    // Sort by tick and convert to delta times
    events.sort_by_key(|e| e.delta.as_int());
    convert_to_delta_times(&mut events);

    // End of track
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    events
}

fn build_performance_track<'a>(
    timeline: &Timeline,
    clock: &TickClock,
    sysex: &'a [Vec<u8>],
) -> Track<'a> {
    let mut events = Vec::new();
    let mut sysex_bodies = sysex.iter();

    for event in &timeline.events {
        let tick = clock.ticks(event.time);
        let mut push = |delta: u28, kind: TrackEventKind<'a>| events.push(TrackEvent { delta, kind });

        match &event.payload {
            TimedPayload::Note(note) => {
                let ch = channel(note.channel);
                let key = data_byte(note.note_number);

                // Note On
                push(
                    tick,
                    TrackEventKind::Midi {
                        channel: ch,
                        message: MidiMessage::NoteOn { key, vel: velocity(note.velocity) },
                    },
                );

                // Note Off
                push(
                    clock.ticks(event.time + note.duration),
                    TrackEventKind::Midi {
                        channel: ch,
                        message: MidiMessage::NoteOff { key, vel: 0.into() },
                    },
                );
            }
            TimedPayload::ControlChange { channel: ch, controller_type, value } => push(
                tick,
                TrackEventKind::Midi {
                    channel: channel(*ch),
                    message: MidiMessage::Controller {
                        controller: data_byte(*controller_type),
                        value: data_byte(*value),
                    },
                },
            ),
            TimedPayload::PitchWheel { channel: ch, value } => push(
                tick,
                TrackEventKind::Midi {
                    channel: channel(*ch),
                    message: MidiMessage::PitchBend { bend: pitch_bend(*value) },
                },
            ),
            TimedPayload::AfterTouch { channel: ch, value } => push(
                tick,
                TrackEventKind::Midi {
                    channel: channel(*ch),
                    message: MidiMessage::ChannelAftertouch { vel: data_byte(*value) },
                },
            ),
            TimedPayload::PolyTouch { channel: ch, note_number, value } => push(
                tick,
                TrackEventKind::Midi {
                    channel: channel(*ch),
                    message: MidiMessage::Aftertouch {
                        key: data_byte(*note_number),
                        vel: data_byte(*value),
                    },
                },
            ),
            TimedPayload::ProgramChange { channel: ch, program_number } => push(
                tick,
                TrackEventKind::Midi {
                    channel: channel(*ch),
                    message: MidiMessage::ProgramChange { program: data_byte(*program_number) },
                },
            ),
            TimedPayload::SystemExclusive { .. } => {
                if let Some(body) = sysex_bodies.next() {
                    push(tick, TrackEventKind::SysEx(body.as_slice()));
                }
            }
            // Meta events live in the conductor track
            TimedPayload::Tempo { .. } | TimedPayload::TimeSignature { .. } => {}
        }
    }

    // Sort by absolute tick time; the sort is stable so a note-off stays
    // ahead of a note-on written later at the same tick
    events.sort_by_key(|e| e.delta.as_int());

    // Convert absolute times to delta times
    convert_to_delta_times(&mut events);

    // End of track
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    events
}

/// Convert absolute tick times to delta times (time since previous event)
fn convert_to_delta_times(events: &mut [TrackEvent]) {
    let mut prev_tick = 0u32;
    for event in events.iter_mut() {
        let current_tick = event.delta.as_int();
        let delta = current_tick.saturating_sub(prev_tick);
        event.delta = delta.into();
        prev_tick = current_tick;
    }
}

fn channel(channel: u8) -> u4 {
    channel.min(15).into()
}

fn data_byte(value: u8) -> u7 {
    value.min(127).into()
}

/// Normalized 0.0–1.0 velocity back to a MIDI data byte.
fn velocity(normalized: f64) -> u7 {
    let raw = (normalized * 127.0).round().clamp(0.0, 127.0) as u8;
    raw.into()
}

/// Signed offset from center to the 14-bit wheel position (center 8192).
fn pitch_bend(value: i16) -> midly::PitchBend {
    let raw = (i32::from(value) + 8192).clamp(0, 0x3FFF) as u16;
    midly::PitchBend(u14::from(raw))
}

/// Time signature denominators are stored as a power of two (4 → 2, 8 → 3).
fn denominator_power(denominator: u8) -> u8 {
    match denominator {
        0 => 2,
        d => d.next_power_of_two().trailing_zeros() as u8,
    }
}

/// SysEx payload as the file stores it: without the leading 0xF0 status
/// byte and terminated by 0xF7.
fn sysex_body(data: &[u8]) -> Vec<u8> {
    let mut body = data.strip_prefix(&[0xF0]).unwrap_or(data).to_vec();
    if body.last() != Some(&0xF7) {
        body.push(0xF7);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{NoteData, TimedEvent};

    fn timeline(events: Vec<TimedEvent>) -> Timeline {
        let note_count = events
            .iter()
            .filter(|e| matches!(e.payload, TimedPayload::Note(_)))
            .count();
        Timeline {
            bpm: 120,
            microseconds_per_beat: 500_000,
            ticks_per_beat: Some(480),
            note_count,
            events,
        }
    }

    fn note(time: f64, note_number: u8) -> TimedEvent {
        TimedEvent {
            tick: (time * 1000.0) as u64,
            time,
            payload: TimedPayload::Note(NoteData {
                channel: 0,
                note_number,
                velocity: 100.0 / 127.0,
                duration: 0.5,
            }),
        }
    }

    fn write(timeline: &Timeline) -> Vec<u8> {
        let mut out = Vec::new();
        write_smf(timeline, &ConversionSettings::default(), &mut out).expect("Failed to write SMF");
        out
    }

    #[test]
    fn test_write_minimal_smf() {
        let out = write(&timeline(vec![note(0.0, 60)]));

        // Verify header
        assert_eq!(&out[0..4], b"MThd");
        // Format 1
        assert_eq!(out[8], 0x00);
        assert_eq!(out[9], 0x01);
        // Conductor + performance track
        assert_eq!(out[10], 0x00);
        assert_eq!(out[11], 0x02);
        // 480 ticks per quarter
        assert_eq!(u16::from_be_bytes([out[12], out[13]]), 480);
    }

    #[test]
    fn test_empty_timeline_still_writes_tracks() {
        let out = write(&timeline(vec![]));
        let smf = Smf::parse(&out).unwrap();
        assert_eq!(smf.tracks.len(), 2);
        assert_eq!(smf.tracks[1].len(), 1); // just end of track
    }

    #[test]
    fn test_note_ticks_follow_tempo_and_ppq() {
        // At 120 BPM and 480 ppq one second is 960 ticks
        let out = write(&timeline(vec![note(0.0, 60), note(1.0, 62)]));
        let smf = Smf::parse(&out).unwrap();
        let track = &smf.tracks[1];

        let mut tick = 0u32;
        let mut absolute = Vec::new();
        for event in track {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = event.kind {
                absolute.push((tick, message));
            }
        }

        assert_eq!(
            absolute,
            vec![
                (0, MidiMessage::NoteOn { key: 60.into(), vel: 100.into() }),
                (480, MidiMessage::NoteOff { key: 60.into(), vel: 0.into() }),
                (960, MidiMessage::NoteOn { key: 62.into(), vel: 100.into() }),
                (1440, MidiMessage::NoteOff { key: 62.into(), vel: 0.into() }),
            ]
        );
    }

    #[test]
    fn test_notes_after_tempo_change_keep_their_time() {
        let tempo = |time: f64, microseconds_per_beat: u32| TimedEvent {
            tick: (time * 1000.0) as u64,
            time,
            payload: TimedPayload::Tempo { microseconds_per_beat, bpm: 0 },
        };
        let out = write(&timeline(vec![
            tempo(0.0, 500_000),
            note(0.0, 60),
            tempo(2.0, 1_000_000),
            note(3.0, 62),
        ]));
        let smf = Smf::parse(&out).unwrap();

        let mut tick = 0u32;
        let mut note_ons = Vec::new();
        for event in &smf.tracks[1] {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { message: MidiMessage::NoteOn { key, .. }, .. } = event.kind {
                note_ons.push((tick, key.as_int()));
            }
        }

        // 2 s at 960 ticks/s, then 1 s at 480 ticks/s
        assert_eq!(note_ons, vec![(0, 60), (2400, 62)]);
    }

    #[test]
    fn test_tick_clock_segments() {
        let clock = TickClock::new(500_000, 480, &[(2.0, 1_000_000), (4.0, 250_000)]);
        assert_eq!(clock.ticks(0.0).as_int(), 0);
        assert_eq!(clock.ticks(1.0).as_int(), 960);
        assert_eq!(clock.ticks(2.0).as_int(), 1920);
        assert_eq!(clock.ticks(3.0).as_int(), 2400);
        assert_eq!(clock.ticks(5.0).as_int(), 2880 + 1920);
    }

    #[test]
    fn test_repeated_tempo_is_not_a_change() {
        let tempo = |time: f64, microseconds_per_beat: u32| TimedEvent {
            tick: (time * 1000.0) as u64,
            time,
            payload: TimedPayload::Tempo { microseconds_per_beat, bpm: 0 },
        };
        let changes = tempo_changes(&timeline(vec![
            tempo(0.0, 500_000),
            tempo(1.0, 500_000),
            tempo(2.0, 600_000),
            tempo(3.0, 600_000),
        ]));
        assert_eq!(changes, vec![(2.0, 600_000)]);
    }

    #[test]
    fn test_conductor_track_tempo_and_meter() {
        let events = vec![
            TimedEvent {
                tick: 0,
                time: 0.0,
                payload: TimedPayload::Tempo { microseconds_per_beat: 500_000, bpm: 120 },
            },
            TimedEvent {
                tick: 0,
                time: 0.0,
                payload: TimedPayload::TimeSignature { numerator: 6, denominator: 8 },
            },
            TimedEvent {
                tick: 2000,
                time: 2.0,
                payload: TimedPayload::Tempo { microseconds_per_beat: 600_000, bpm: 100 },
            },
        ];
        let out = write(&timeline(events));
        let smf = Smf::parse(&out).unwrap();
        let metas: Vec<_> = smf.tracks[0]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Meta(meta) => Some((e.delta.as_int(), meta)),
                _ => None,
            })
            .collect();

        assert_eq!(
            metas,
            vec![
                (0, MetaMessage::Tempo(500_000.into())),
                (0, MetaMessage::TimeSignature(6, 3, 24, 8)),
                (1920, MetaMessage::Tempo(600_000.into())),
                (0, MetaMessage::EndOfTrack),
            ]
        );
    }

    #[test]
    fn test_channel_messages() {
        let at = |payload| TimedEvent { tick: 0, time: 0.0, payload };
        let out = write(&timeline(vec![
            at(TimedPayload::ControlChange { channel: 1, controller_type: 7, value: 100 }),
            at(TimedPayload::PitchWheel { channel: 1, value: 0 }),
            at(TimedPayload::AfterTouch { channel: 1, value: 64 }),
            at(TimedPayload::PolyTouch { channel: 1, note_number: 60, value: 32 }),
            at(TimedPayload::ProgramChange { channel: 1, program_number: 24 }),
            at(TimedPayload::SystemExclusive { data: vec![240, 1, 2, 3, 247] }),
        ]));
        let smf = Smf::parse(&out).unwrap();
        let kinds: Vec<_> = smf.tracks[1].iter().map(|e| e.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TrackEventKind::Midi {
                    channel: 1.into(),
                    message: MidiMessage::Controller { controller: 7.into(), value: 100.into() },
                },
                TrackEventKind::Midi {
                    channel: 1.into(),
                    message: MidiMessage::PitchBend { bend: midly::PitchBend(8192.into()) },
                },
                TrackEventKind::Midi {
                    channel: 1.into(),
                    message: MidiMessage::ChannelAftertouch { vel: 64.into() },
                },
                TrackEventKind::Midi {
                    channel: 1.into(),
                    message: MidiMessage::Aftertouch { key: 60.into(), vel: 32.into() },
                },
                TrackEventKind::Midi {
                    channel: 1.into(),
                    message: MidiMessage::ProgramChange { program: 24.into() },
                },
                TrackEventKind::SysEx(&[1, 2, 3, 0xF7]),
                TrackEventKind::Meta(MetaMessage::EndOfTrack),
            ]
        );
    }

    #[test]
    fn test_delta_time_conversion() {
        let mut events = vec![
            TrackEvent {
                delta: 0.into(),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Test")),
            },
            TrackEvent {
                delta: 100.into(),
                kind: TrackEventKind::Midi {
                    channel: 0.into(),
                    message: MidiMessage::NoteOn { key: 60.into(), vel: 64.into() },
                },
            },
            TrackEvent {
                delta: 200.into(),
                kind: TrackEventKind::Midi {
                    channel: 0.into(),
                    message: MidiMessage::NoteOff { key: 60.into(), vel: 0.into() },
                },
            },
        ];

        convert_to_delta_times(&mut events);

        assert_eq!(events[0].delta.as_int(), 0);
        assert_eq!(events[1].delta.as_int(), 100);
        assert_eq!(events[2].delta.as_int(), 100); // 200 - 100 = 100
    }

    #[test]
    fn test_value_clamping() {
        assert_eq!(channel(20).as_int(), 15);
        assert_eq!(data_byte(200).as_int(), 127);
        assert_eq!(velocity(1.0).as_int(), 127);
        assert_eq!(velocity(2.0).as_int(), 127);
        assert_eq!(velocity(64.0 / 127.0).as_int(), 64);
        assert_eq!(pitch_bend(-8192).0.as_int(), 0);
        assert_eq!(pitch_bend(8191).0.as_int(), 0x3FFF);
        assert_eq!(pitch_bend(8192).0.as_int(), 0x3FFF);
    }

    #[test]
    fn test_denominator_power() {
        assert_eq!(denominator_power(1), 0);
        assert_eq!(denominator_power(2), 1);
        assert_eq!(denominator_power(4), 2);
        assert_eq!(denominator_power(8), 3);
        assert_eq!(denominator_power(0), 2);
    }

    #[test]
    fn test_sysex_body() {
        assert_eq!(sysex_body(&[0xF0, 1, 2, 0xF7]), vec![1, 2, 0xF7]);
        assert_eq!(sysex_body(&[1, 2]), vec![1, 2, 0xF7]);
        assert_eq!(sysex_body(&[]), vec![0xF7]);
    }
}
