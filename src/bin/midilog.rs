use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use midilog::converters::event_log_to_midi::{convert_file, read_event_log, ConversionSettings};
use midilog::converters::ConversionSummary;
use midilog::generator::{preview, LogGenerator};

#[derive(Parser)]
#[command(name = "midilog")]
#[command(about = "Convert music event logs to MIDI files", long_about = None)]
struct Cli {
    /// Print more diagnostics (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SettingsArgs {
    /// JSON file with conversion settings
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Ticks per quarter note of the written file
    #[arg(long)]
    ppq: Option<u16>,

    /// Length of every note, in seconds
    #[arg(long)]
    note_duration: Option<f64>,
}

impl SettingsArgs {
    fn load(&self) -> anyhow::Result<ConversionSettings> {
        let mut settings = match &self.settings {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading settings {}", path.display()))?;
                ConversionSettings::from_json(&json)?
            }
            None => ConversionSettings::default(),
        };
        if let Some(ppq) = self.ppq {
            settings.ppq = ppq;
        }
        if let Some(note_duration) = self.note_duration {
            settings.note_duration = note_duration;
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an event log file to a MIDI file
    Convert {
        /// Path to the event log
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Path of the .mid file to write
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Parse an event log and print the events as JSON
    Parse {
        /// Path to the event log
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Print the reconstructed timeline instead of the raw events
        #[arg(long)]
        timeline: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Run the log generator, then convert its output
    Generate {
        /// Where to write the generated event log
        #[arg(long, default_value = "generated_midi.cairo")]
        log_output: PathBuf,
        /// Where to write the MIDI file
        #[arg(long, default_value = "generated_midi.mid")]
        midi_output: PathBuf,
        /// Only generate the log (skip MIDI conversion)
        #[arg(long, conflicts_with = "midi_only")]
        log_only: bool,
        /// Only convert an existing log
        #[arg(long)]
        midi_only: bool,
        /// Generator command line (default: scarb test with the MIDI output filter)
        #[arg(long)]
        command: Option<String>,
        /// Directory to run the generator in
        #[arg(long, value_name = "DIR")]
        working_dir: Option<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_summary(summary: &ConversionSummary) {
    println!("MIDI Stats:");
    println!("   - Tracks: {}", summary.tracks);
    println!("   - Duration: {:.2} seconds", summary.duration);
    println!("   - BPM: {}", summary.bpm);
    for (index, notes) in summary.notes_per_track.iter().enumerate() {
        println!("   - Track {}: {} notes", index + 1, notes);
    }
}

fn convert(input: &Path, output: &Path, settings: &ConversionSettings) -> anyhow::Result<()> {
    let conversion = convert_file(input, output, settings)
        .with_context(|| format!("converting {}", input.display()))?;
    println!("MIDI file created successfully: {}", output.display());
    print_summary(&conversion.summary());
    Ok(())
}

fn generate(log_output: &Path, command: Option<&str>, working_dir: Option<&Path>) -> anyhow::Result<()> {
    let mut generator = match command {
        Some(line) => match LogGenerator::from_command_line(line) {
            Some(generator) => generator,
            None => bail!("empty generator command"),
        },
        None => LogGenerator::scarb(),
    };
    if let Some(dir) = working_dir {
        generator = generator.with_working_dir(dir.to_path_buf());
    }

    let lines = generator
        .run(log_output)
        .with_context(|| format!("generating {}", log_output.display()))?;
    println!("Event log generated successfully: {} ({} lines)", log_output.display(), lines);

    let text = read_event_log(log_output)?;
    let (shown, rest) = preview(&text, 10);
    println!();
    println!("Preview of generated log:");
    println!("-------------------------");
    for line in shown {
        println!("{}", line);
    }
    if rest > 0 {
        println!("... and {} more lines", rest);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Convert { input, output, settings } => {
            convert(input, output, &settings.load()?)?;
        }
        Commands::Parse { input, timeline, settings } => {
            let text = read_event_log(input)?;
            let events = midilog::parse_event_log(&text);
            if *timeline {
                let timeline = midilog::build_timeline(&events, &settings.load()?);
                println!("{}", serde_json::to_string_pretty(&timeline)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&events)?);
            }
        }
        Commands::Generate {
            log_output,
            midi_output,
            log_only,
            midi_only,
            command,
            working_dir,
            settings,
        } => {
            let settings = settings.load()?;
            if !midi_only {
                generate(log_output, command.as_deref(), working_dir.as_deref())?;
            }
            if !log_only {
                convert(log_output, midi_output, &settings)?;
            }
            println!();
            println!("Generation complete!");
            if !midi_only {
                println!("Event log: {}", log_output.display());
            }
            if !log_only {
                println!("MIDI file: {}", midi_output.display());
            }
        }
    }
    Ok(())
}
