//! Event log conversion API
//!
//! JavaScript entry points for parsing logs, building timelines and
//! exporting MIDI bytes.

use wasm_bindgen::prelude::*;

use crate::api::helpers::{js_error, serialize, settings_from_json};
use crate::{wasm_info, wasm_log};

/// Parse a single log line.
///
/// Returns the event as an object, or `null` when the line is not an event.
#[wasm_bindgen(js_name = parseEventLine)]
pub fn parse_event_line(line: &str) -> Result<JsValue, JsValue> {
    match crate::parse::parse_event(line) {
        Some(event) => serialize(&event, "Event"),
        None => Ok(JsValue::NULL),
    }
}

/// Parse a whole log into an array of events, skipping non-event lines.
#[wasm_bindgen(js_name = parseEventLog)]
pub fn parse_event_log(text: &str) -> Result<JsValue, JsValue> {
    let events = crate::parse::parse_event_log(text);
    wasm_log!("parseEventLog: {} events", events.len());
    serialize(&events, "Event")
}

/// Build the normalized timeline of a log.
///
/// # Parameters
/// - `text`: The event log
/// - `settings_json`: Optional `ConversionSettings` as JSON
#[wasm_bindgen(js_name = buildTimeline)]
pub fn build_timeline(text: &str, settings_json: Option<String>) -> Result<JsValue, JsValue> {
    let settings = settings_from_json(settings_json)?;
    let events = crate::parse::parse_event_log(text);
    let timeline = crate::timeline::build_timeline(&events, &settings);
    serialize(&timeline, "Timeline")
}

/// Convert a log to MIDI file bytes.
///
/// # Parameters
/// - `text`: The event log
/// - `settings_json`: Optional `ConversionSettings` as JSON
///
/// # Returns
/// Uint8Array containing the MIDI file
#[wasm_bindgen(js_name = convertEventLogToMidi)]
pub fn convert_event_log_to_midi(
    text: &str,
    settings_json: Option<String>,
) -> Result<js_sys::Uint8Array, JsValue> {
    wasm_info!("convertEventLogToMidi called");

    let settings = settings_from_json(settings_json)?;
    let conversion = crate::converters::event_log_to_midi(text, &settings)
        .map_err(|e| js_error(format!("MIDI conversion error: {}", e)))?;

    wasm_info!(
        "  MIDI generated: {} bytes, {} notes at {} BPM",
        conversion.midi.len(),
        conversion.timeline.note_count,
        conversion.timeline.bpm
    );

    // Convert to Uint8Array for JavaScript
    let uint8_array = js_sys::Uint8Array::new_with_length(conversion.midi.len() as u32);
    uint8_array.copy_from(&conversion.midi);

    Ok(uint8_array)
}
