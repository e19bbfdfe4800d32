//! Timeline reconstruction from delta-timed events
//!
//! A single forward fold over the parsed events. The state record carries
//! the running clock, the tempo seen so far and the output accumulator;
//! nothing is looked ahead at or reordered.

use crate::converters::event_log_to_midi::ConversionSettings;
use crate::models::{Event, Message};
use crate::timeline::defaults::{bpm_from_tempo, MAX_VELOCITY};
use crate::timeline::model::{NoteData, TimedEvent, TimedPayload, Timeline};

/// State threaded through the fold.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineState {
    /// Absolute ticks of the next event
    pub clock_ticks: u64,
    /// Tempo of the first tempo event, which sets the global tempo
    pub first_tempo: Option<u32>,
    /// Tempo in force, starting at the default
    pub current_tempo: u32,
    pub ticks_per_beat: Option<u16>,
    pub note_count: usize,
    pub events: Vec<TimedEvent>,
}

impl TimelineState {
    pub fn new(default_tempo: u32) -> Self {
        Self {
            clock_ticks: 0,
            first_tempo: None,
            current_tempo: default_tempo,
            ticks_per_beat: None,
            note_count: 0,
            events: Vec::new(),
        }
    }
}

/// Fixed parameters of one reconstruction pass.
#[derive(Debug, Clone, Copy)]
pub struct TimelineBuilder {
    note_duration: f64,
    tick_divisor: f64,
    default_tempo: u32,
}

impl TimelineBuilder {
    pub fn new(settings: &ConversionSettings) -> Self {
        Self {
            note_duration: settings.note_duration,
            tick_divisor: settings.tick_divisor,
            default_tempo: settings.default_tempo,
        }
    }

    pub fn initial_state(&self) -> TimelineState {
        TimelineState::new(self.default_tempo)
    }

    /// Log ticks to output seconds.
    pub fn seconds(&self, ticks: u64) -> f64 {
        ticks as f64 / self.tick_divisor
    }

    /// Process one event. It is stamped with the clock as it stood before
    /// its own delta, then the delta is added for the next event.
    pub fn step(&self, mut state: TimelineState, event: &Event) -> TimelineState {
        let tick = state.clock_ticks;
        let time = self.seconds(tick);
        log::trace!("{} at tick {}", event.kind().name(), tick);

        let payload = match &event.message {
            Message::Header { ticks_per_beat } => {
                if state.ticks_per_beat.is_none() {
                    state.ticks_per_beat = Some(*ticks_per_beat);
                } else {
                    log::debug!("ignoring repeated header at tick {}", tick);
                }
                None
            }
            Message::NoteOn { channel, note_number, velocity } => {
                state.note_count += 1;
                Some(TimedPayload::Note(NoteData {
                    channel: *channel,
                    note_number: *note_number,
                    velocity: f64::from(*velocity) / MAX_VELOCITY,
                    duration: self.note_duration,
                }))
            }
            Message::NoteOff { .. } => None,
            Message::SetTempo { microseconds_per_beat } => {
                let tempo = *microseconds_per_beat;
                state.first_tempo.get_or_insert(tempo);
                if tempo == 0 {
                    log::warn!("ignoring zero tempo at tick {}", tick);
                    None
                } else {
                    if tempo != state.current_tempo {
                        log::debug!(
                            "tempo {} -> {} us per beat at tick {}",
                            state.current_tempo,
                            tempo,
                            tick
                        );
                        state.current_tempo = tempo;
                    }
                    Some(TimedPayload::Tempo {
                        microseconds_per_beat: tempo,
                        bpm: bpm_from_tempo(tempo),
                    })
                }
            }
            Message::TimeSignature { numerator, denominator } => Some(TimedPayload::TimeSignature {
                numerator: *numerator,
                denominator: *denominator,
            }),
            Message::ControlChange { channel, controller_type, value } => {
                Some(TimedPayload::ControlChange {
                    channel: *channel,
                    controller_type: *controller_type,
                    value: *value,
                })
            }
            Message::PitchWheel { channel, value } => Some(TimedPayload::PitchWheel {
                channel: *channel,
                value: *value,
            }),
            Message::AfterTouch { channel, value } => Some(TimedPayload::AfterTouch {
                channel: *channel,
                value: *value,
            }),
            Message::PolyTouch { channel, note_number, value } => Some(TimedPayload::PolyTouch {
                channel: *channel,
                note_number: *note_number,
                value: *value,
            }),
            Message::ProgramChange { channel, program_number } => {
                Some(TimedPayload::ProgramChange {
                    channel: *channel,
                    program_number: *program_number,
                })
            }
            Message::SystemExclusive { data } => Some(TimedPayload::SystemExclusive {
                data: data.clone(),
            }),
        };

        if let Some(payload) = payload {
            state.events.push(TimedEvent { tick, time, payload });
        }

        state.clock_ticks = state.clock_ticks.saturating_add(event.delta_ticks());
        state
    }

    /// Resolve the global tempo and hand over the accumulated stream.
    pub fn finish(&self, state: TimelineState) -> Timeline {
        let microseconds_per_beat = match state.first_tempo {
            Some(tempo) if tempo > 0 => tempo,
            _ => self.default_tempo,
        };

        log::debug!(
            "timeline: {} events, {} notes, final clock {} ticks",
            state.events.len(),
            state.note_count,
            state.clock_ticks
        );

        Timeline {
            bpm: bpm_from_tempo(microseconds_per_beat),
            microseconds_per_beat,
            ticks_per_beat: state.ticks_per_beat,
            note_count: state.note_count,
            events: state.events,
        }
    }
}

/// Build the normalized timeline from parsed events in one pass.
pub fn build_timeline(events: &[Event], settings: &ConversionSettings) -> Timeline {
    let builder = TimelineBuilder::new(settings);
    let state = events
        .iter()
        .fold(builder.initial_state(), |state, event| builder.step(state, event));
    builder.finish(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_on(delta: u32) -> Event {
        Event::new(
            Message::NoteOn { channel: 0, note_number: 60, velocity: 127 },
            Some(delta),
        )
    }

    fn tempo(us: u32, delta: Option<u32>) -> Event {
        Event::new(Message::SetTempo { microseconds_per_beat: us }, delta)
    }

    #[test]
    fn test_stamp_is_clock_before_delta() {
        let events = vec![note_on(0), note_on(184), note_on(5)];
        let timeline = build_timeline(&events, &ConversionSettings::default());

        let ticks: Vec<u64> = timeline.events.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 0, 184]);
    }

    #[test]
    fn test_missing_delta_does_not_advance_clock() {
        let builder = TimelineBuilder::new(&ConversionSettings::default());
        let state = builder.initial_state();
        let state = builder.step(state, &note_on(10));
        let state = builder.step(state, &tempo(600_000, None));
        assert_eq!(state.clock_ticks, 10);
        let state = builder.step(state, &note_on(0));
        assert_eq!(state.events.last().map(|e| e.tick), Some(10));
    }

    #[test]
    fn test_first_tempo_wins() {
        let events = vec![tempo(600_000, Some(0)), note_on(100), tempo(400_000, Some(0))];
        let timeline = build_timeline(&events, &ConversionSettings::default());
        assert_eq!(timeline.bpm, 100);
        assert_eq!(timeline.microseconds_per_beat, 600_000);

        let markers: Vec<u32> = timeline
            .events
            .iter()
            .filter_map(|e| match e.payload {
                TimedPayload::Tempo { bpm, .. } => Some(bpm),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![100, 150]);
    }

    #[test]
    fn test_tempo_fallback() {
        let timeline = build_timeline(&[note_on(0)], &ConversionSettings::default());
        assert_eq!(timeline.bpm, 120);
        assert_eq!(timeline.microseconds_per_beat, 500_000);
    }

    #[test]
    fn test_zero_first_tempo_falls_back() {
        let events = vec![tempo(0, Some(0)), tempo(600_000, Some(0))];
        let builder = TimelineBuilder::new(&ConversionSettings::default());
        let state = events
            .iter()
            .fold(builder.initial_state(), |s, e| builder.step(s, e));
        assert_eq!(state.first_tempo, Some(0));
        assert_eq!(state.current_tempo, 600_000);

        let timeline = builder.finish(state);
        assert_eq!(timeline.bpm, 120);
        assert_eq!(timeline.events.len(), 1);
    }

    #[test]
    fn test_note_emission() {
        let events = vec![
            note_on(1500),
            Event::new(Message::NoteOff { channel: 0, note_number: 60, velocity: 0 }, Some(0)),
            Event::new(
                Message::NoteOn { channel: 2, note_number: 64, velocity: 0 },
                Some(0),
            ),
        ];
        let timeline = build_timeline(&events, &ConversionSettings::default());

        assert_eq!(timeline.note_count, 2);
        assert_eq!(timeline.events.len(), 2);
        let (event, note) = timeline.notes().nth(1).unwrap();
        assert_eq!(event.tick, 1500);
        assert_eq!(event.time, 1.5);
        assert_eq!(note.channel, 2);
        assert_eq!(note.velocity, 0.0);
        assert_eq!(note.duration, 0.5);

        let (_, first) = timeline.notes().next().unwrap();
        assert_eq!(first.velocity, 1.0);
    }

    #[test]
    fn test_header_is_recorded_not_emitted() {
        let events = vec![
            Event::new(Message::Header { ticks_per_beat: 480 }, Some(0)),
            Event::new(Message::Header { ticks_per_beat: 96 }, Some(0)),
        ];
        let timeline = build_timeline(&events, &ConversionSettings::default());
        assert_eq!(timeline.ticks_per_beat, Some(480));
        assert!(timeline.events.is_empty());
    }

    #[test]
    fn test_passthrough_kinds_keep_payload() {
        let events = vec![
            Event::new(Message::TimeSignature { numerator: 3, denominator: 4 }, Some(0)),
            Event::new(Message::ControlChange { channel: 1, controller_type: 7, value: 100 }, Some(10)),
            Event::new(Message::PitchWheel { channel: 1, value: -200 }, Some(10)),
            Event::new(Message::AfterTouch { channel: 1, value: 64 }, Some(10)),
            Event::new(Message::PolyTouch { channel: 1, note_number: 60, value: 64 }, Some(10)),
            Event::new(Message::ProgramChange { channel: 1, program_number: 24 }, Some(10)),
            Event::new(Message::SystemExclusive { data: vec![240, 1, 247] }, Some(10)),
        ];
        let timeline = build_timeline(&events, &ConversionSettings::default());

        assert_eq!(timeline.events.len(), 7);
        assert_eq!(timeline.note_count, 0);
        assert_eq!(
            timeline.events[2].payload,
            TimedPayload::PitchWheel { channel: 1, value: -200 }
        );
        assert_eq!(timeline.events[6].tick, 50);
        assert_eq!(timeline.events[6].time, 0.05);
    }

    #[test]
    fn test_custom_settings() {
        let settings = ConversionSettings {
            note_duration: 0.25,
            tick_divisor: 480.0,
            ..ConversionSettings::default()
        };
        let timeline = build_timeline(&[note_on(480), note_on(0)], &settings);
        let times: Vec<f64> = timeline.events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.0, 1.0]);
        assert_eq!(timeline.notes().next().unwrap().1.duration, 0.25);
    }
}
