//! Recursive descent parser for event log lines
//!
//! A line carries at most one event, shaped as
//! `Namespace::TAG(Payload { field: value, ... })`. Everything else on the
//! line (indentation, a trailing comma) is ignored, and lines that do not
//! have that shape or name an unknown tag yield `None`.
//!
//! Production rules:
//! ```text
//! content := [Ident] "{" fields "}" | fields
//! fields  := (field ("," field)* [","])?
//! field   := Ident ":" value
//! value   := Int
//!          | "[" (value ("," value)* [","])? "]"
//!          | Path "(" value ")"
//!          | Path ["{" fields "}"]
//! ```

use crate::models::{Event, EventKind, Message};
use crate::parse::tokens::{is_none_path, Cursor, FieldInt, Fields, Value};

/// Parse one log line into an event.
///
/// Returns `None` for lines that are not events. Never fails otherwise:
/// missing or malformed numeric fields read as zero, and numbers too large
/// for their field saturate.
pub fn parse_event(line: &str) -> Option<Event> {
    let (kind, content) = split_outer(line)?;
    let fields = parse_content(content);
    Some(build_event(kind, &fields))
}

/// Parse every line of a log, keeping only the events.
pub fn parse_event_log(text: &str) -> Vec<Event> {
    let mut skipped = 0usize;
    let events: Vec<Event> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let event = parse_event(line);
            if event.is_none() {
                skipped += 1;
            }
            event
        })
        .collect();

    log::debug!("parsed {} events, skipped {} lines", events.len(), skipped);
    events
}

/// Locate `Namespace::TAG(content)` on the line.
///
/// The namespace is any identifier, the tag is one of the known `[A-Z_]+`
/// tags, and the content runs to the last `)` on the line and must not be
/// blank. Candidates that fail any of these are skipped and the scan goes on.
fn split_outer(line: &str) -> Option<(EventKind, &str)> {
    for (idx, _) in line.match_indices("::") {
        let namespace_len = line[..idx]
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .count();
        if namespace_len == 0 {
            continue;
        }

        let after = &line[idx + 2..];
        let tag_len = after
            .chars()
            .take_while(|c| c.is_ascii_uppercase() || *c == '_')
            .count();
        if tag_len == 0 || !after[tag_len..].starts_with('(') {
            continue;
        }

        let tag = &after[..tag_len];
        let Some(kind) = EventKind::from_tag(tag) else {
            log::trace!("skipping unknown tag {}", tag);
            continue;
        };

        let body = &after[tag_len + 1..];
        let Some(close) = body.rfind(')') else {
            continue;
        };
        let content = &body[..close];
        if content.trim().is_empty() {
            continue;
        }
        return Some((kind, content));
    }
    None
}

/// `content := [Ident] "{" fields "}" | fields`
fn parse_content(content: &str) -> Fields {
    let mut cursor = Cursor::new(content);
    cursor.skip_ws();

    let start = cursor.pos();
    if cursor.ident().is_some() {
        cursor.skip_ws();
    }
    if cursor.eat('{') {
        return parse_fields(&mut cursor, Some('}'));
    }

    cursor.reset(start);
    parse_fields(&mut cursor, None)
}

/// `fields := (field ("," field)* [","])?`, stopping at `close`.
///
/// A field that does not fit the grammar is kept as an opaque value and
/// parsing resumes after the next top-level comma.
fn parse_fields(cursor: &mut Cursor<'_>, close: Option<char>) -> Fields {
    let mut fields = Fields::new();

    loop {
        cursor.skip_ws();
        if cursor.at_end() {
            break;
        }
        if let Some(c) = close {
            if cursor.eat(c) {
                break;
            }
        }

        let start = cursor.pos();
        match parse_field(cursor) {
            Some((name, value)) => {
                fields.push(name, value);
                cursor.skip_ws();
                if !cursor.eat(',') && cursor.peek() != close && !cursor.at_end() {
                    // Trailing junk after a value
                    cursor.skip_to_delimiter(close);
                }
            }
            None => {
                cursor.reset(start);
                let name = cursor.ident();
                cursor.reset(start);
                let skipped = cursor.skip_to_delimiter(close);
                if let Some(name) = name {
                    let text = skipped[name.len()..].trim_start();
                    let text = text.strip_prefix(':').unwrap_or(text).trim();
                    fields.push(name, Value::Opaque(text.to_string()));
                }
            }
        }
    }

    fields
}

/// `field := Ident ":" value`
fn parse_field<'a>(cursor: &mut Cursor<'a>) -> Option<(&'a str, Value)> {
    let name = cursor.ident()?;
    cursor.skip_ws();
    if !cursor.eat(':') {
        return None;
    }
    let value = parse_value(cursor)?;
    Some((name, value))
}

fn parse_value(cursor: &mut Cursor<'_>) -> Option<Value> {
    cursor.skip_ws();
    match cursor.peek()? {
        '[' => {
            cursor.bump();
            parse_list(cursor)
        }
        c if c.is_ascii_digit() || c == '-' || c == '+' => cursor.integer().map(Value::Int),
        c if c.is_ascii_alphabetic() || c == '_' => {
            let path = cursor.path()?.to_string();
            let checkpoint = cursor.pos();
            cursor.skip_ws();

            if cursor.eat('(') {
                let inner = parse_value(cursor)?;
                cursor.skip_ws();
                if !cursor.eat(')') {
                    return None;
                }
                return Some(Value::Wrapped {
                    path,
                    inner: Box::new(inner),
                });
            }

            if cursor.eat('{') {
                let fields = parse_fields(cursor, Some('}'));
                return Some(Value::Struct { path, fields });
            }

            cursor.reset(checkpoint);
            if is_none_path(&path) {
                Some(Value::None)
            } else {
                Some(Value::Path(path))
            }
        }
        _ => None,
    }
}

/// List items after the opening `[`. Items that are not values are kept
/// as opaque text.
fn parse_list(cursor: &mut Cursor<'_>) -> Option<Value> {
    let mut items = Vec::new();

    loop {
        cursor.skip_ws();
        if cursor.eat(']') {
            return Some(Value::List(items));
        }
        if cursor.at_end() {
            return None;
        }

        let start = cursor.pos();
        let parsed = parse_value(cursor);
        cursor.skip_ws();
        let terminated = cursor.peek() == Some(',') || cursor.peek() == Some(']');
        match parsed {
            Some(value) if terminated => {
                items.push(value);
                cursor.eat(',');
            }
            _ => {
                cursor.reset(start);
                let skipped = cursor.skip_to_delimiter(Some(']'));
                items.push(Value::Opaque(skipped.trim().to_string()));
            }
        }
    }
}

/// Delta time of a non-tempo event: a missing, absent or unreadable time
/// field counts as zero.
fn delta_time(fields: &Fields) -> Option<u32> {
    Some(fields.number("time"))
}

/// Delta time of a tempo event. Only a present value moves the clock;
/// `None`, `Option::None` and a missing field all mean "no delta".
fn tempo_delta_time(fields: &Fields) -> Option<u32> {
    let value = fields.get("time")?;
    if value.is_none() {
        return None;
    }
    value.unwrap_int().map(u32::saturating_from)
}

/// Integer items of a byte list; anything else is dropped.
fn byte_list(fields: &Fields, name: &str) -> Vec<u8> {
    match fields.get(name) {
        Some(Value::List(items)) => items
            .iter()
            .filter_map(Value::as_int)
            .filter_map(|n| u8::try_from(n).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn build_event(kind: EventKind, fields: &Fields) -> Event {
    let message = match kind {
        EventKind::Header => Message::Header {
            ticks_per_beat: fields.number("ticksPerBeat"),
        },
        EventKind::NoteOn | EventKind::NoteOff => {
            let channel = fields.number("channel");
            let note_number = fields.data_byte("note");
            let velocity = fields.data_byte("velocity");
            // A note-on with zero velocity is a note-off
            if kind == EventKind::NoteOn && velocity > 0 {
                Message::NoteOn { channel, note_number, velocity }
            } else {
                Message::NoteOff { channel, note_number, velocity }
            }
        }
        EventKind::SetTempo => Message::SetTempo {
            microseconds_per_beat: fields.number("tempo"),
        },
        EventKind::TimeSignature => Message::TimeSignature {
            numerator: fields.number("numerator"),
            denominator: fields.number("denominator"),
        },
        EventKind::ControlChange => Message::ControlChange {
            channel: fields.number("channel"),
            controller_type: fields.data_byte("control"),
            value: fields.data_byte("value"),
        },
        EventKind::PitchWheel => Message::PitchWheel {
            channel: fields.number("channel"),
            value: fields.number("pitch"),
        },
        EventKind::AfterTouch => Message::AfterTouch {
            channel: fields.number("channel"),
            value: fields.data_byte("value"),
        },
        EventKind::PolyTouch => Message::PolyTouch {
            channel: fields.number("channel"),
            note_number: fields.data_byte("note"),
            value: fields.data_byte("value"),
        },
        EventKind::ProgramChange => Message::ProgramChange {
            channel: fields.number("channel"),
            program_number: fields.data_byte("program"),
        },
        EventKind::SystemExclusive => Message::SystemExclusive {
            data: byte_list(fields, "data"),
        },
    };

    let delta = match kind {
        EventKind::SetTempo => tempo_delta_time(fields),
        _ => delta_time(fields),
    };

    Event::new(message, delta)
}
