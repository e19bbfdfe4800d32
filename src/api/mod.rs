//! Event log WASM API
//!
//! This module provides the JavaScript-facing API.
//!
//! # Module Structure
//!
//! - `helpers`: Console logging, serialization and settings parsing
//! - `convert`: Parsing, timeline and MIDI export entry points

pub mod helpers;
pub mod convert;

pub use convert::{build_timeline, convert_event_log_to_midi, parse_event_line, parse_event_log};
