//! Event log to MIDI converter
//!
//! Turns the textual event trace of a music-generating program into a
//! Standard MIDI File. Each log line is parsed into a typed event, the
//! events are folded into an absolute timeline, and the timeline is
//! written out through `midly`. The same pipeline is exposed to
//! JavaScript as a WASM module.

pub mod models;
pub mod parse;
pub mod timeline;
pub mod converters;
pub mod generator;
pub mod api;

// Re-export commonly used types
pub use models::event::*;
pub use parse::{parse_event, parse_event_log};
pub use timeline::{build_timeline, Timeline};
pub use converters::{event_log_to_midi, Conversion, ConversionSettings, ConvertError};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    #[cfg(feature = "console_log")]
    if console_log::init_with_level(log::Level::Debug).is_err() {
        return;
    }

    log::info!("midilog WASM module initialized");
}
