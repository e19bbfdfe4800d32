mod types;
mod write;

pub use types::*;
pub use write::write_smf;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::parse::parse_event_log;
use crate::timeline::build_timeline;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input file not found: {}", path.display())]
    MissingInputFile { path: PathBuf },
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("midi write error: {0}")]
    Midi(String),
    #[error("invalid settings: {0}")]
    Settings(String),
    #[error("log generator failed: {0}")]
    Generator(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Convert event log text to SMF (Standard MIDI File) bytes
///
/// # Arguments
/// * `text` - Event log, one event per line; other lines are skipped
/// * `settings` - Output resolution, note length and time scale
///
/// # Returns
/// * The normalized timeline and the MIDI file bytes
pub fn event_log_to_midi(text: &str, settings: &ConversionSettings) -> Result<Conversion> {
    settings.validate()?;

    let events = parse_event_log(text);
    let timeline = build_timeline(&events, settings);

    let mut midi = Vec::new();
    write_smf(&timeline, settings, &mut midi)?;

    log::info!(
        "converted {} events into {} notes at {} BPM ({} bytes)",
        events.len(),
        timeline.note_count,
        timeline.bpm,
        midi.len()
    );

    Ok(Conversion { timeline, midi })
}

/// Read an event log from disk.
pub fn read_event_log(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ConvertError::MissingInputFile { path: path.to_path_buf() });
    }
    fs::read_to_string(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a log file and write the resulting MIDI file.
pub fn convert_file(input: &Path, output: &Path, settings: &ConversionSettings) -> Result<Conversion> {
    let text = read_event_log(input)?;
    let conversion = event_log_to_midi(&text, settings)?;

    fs::write(output, &conversion.midi).map_err(|source| ConvertError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    log::info!("wrote {}", output.display());
    Ok(conversion)
}
