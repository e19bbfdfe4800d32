//! Format converters
//!
//! This module contains the event log to Standard MIDI File converter.

pub mod event_log_to_midi;

// Re-export for convenience
pub use event_log_to_midi::{
    convert_file,
    event_log_to_midi,
    Conversion,
    ConversionSettings,
    ConversionSummary,
    ConvertError,
};
