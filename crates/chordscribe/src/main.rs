//! chordscribe - chord sequences and note lists from transcribed MIDI
//!
//! Subcommands:
//! - `chordscribe chords <input>...` - Label chords and write chord/note tables
//! - `chordscribe notes <input>` - Print the chronological note table
//! - `chordscribe exemplars <corpus> <out>` - Build an exemplar file from a chord corpus
//! - `chordscribe evaluate <corpus>` - Score the classifier against a labelled chord corpus
//! - `chordscribe render <table> <out>` - Turn a chord table back into MIDI
//! - `chordscribe config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::Result;
use chordconf::ChordConfig;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "chordscribe")]
#[command(about = "Chord sequences and note lists from transcribed MIDI")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./chordscribe.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label the chords of one or more MIDI files
    Chords {
        /// MIDI files to process
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Exemplar JSON file or labelled chord corpus directory
        #[arg(short, long)]
        classifier: Option<PathBuf>,

        /// Directory for the output tables
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Ticks within which a repeated note extends its range
        #[arg(long)]
        merge_gap: Option<u32>,

        /// Ticks after which the next note starts a new chord
        #[arg(long)]
        chord_gap: Option<u32>,

        /// Shared pitches at which a chord counts as a near duplicate
        #[arg(long)]
        similarity: Option<usize>,

        /// Print one JSON summary line per input instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the chronological note table of a MIDI file
    Notes {
        /// MIDI file to read
        input: PathBuf,
    },

    /// Build an exemplar file from a directory of labelled chord MIDI files
    Exemplars {
        /// Directory of chord MIDI files, one labelled chord per track
        corpus: PathBuf,

        /// Where to write the exemplar JSON
        output: PathBuf,
    },

    /// Score the classifier against a directory of labelled chord MIDI files
    Evaluate {
        /// Directory of chord MIDI files, one labelled chord per track
        corpus: PathBuf,

        /// Exemplar JSON file or labelled chord corpus directory
        #[arg(short, long)]
        classifier: Option<PathBuf>,

        /// Predictions CSV to write (default: <output_dir>/evaluation.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also list labels whose precision is below this value
        #[arg(long)]
        precision_below: Option<f64>,
    },

    /// Recreate a MIDI file from a chord table
    Render {
        /// Chord table written by `chords`
        table: PathBuf,

        /// MIDI file to write
        output: PathBuf,

        /// Ticks each chord sounds
        #[arg(long, default_value = "480")]
        chord_ticks: u32,

        /// Tempo in microseconds per beat
        #[arg(
            long,
            default_value = "500000",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(midi_chords::MAX_TEMPO_USEC))
        )]
        tempo: u32,
    },

    /// Show the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = ChordConfig::load_with_sources_from(cli.config.as_deref())?;

    // Logs go to stderr so tables on stdout stay clean
    let filter = tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chords {
            inputs,
            classifier,
            out_dir,
            merge_gap,
            chord_gap,
            similarity,
            json,
        } => {
            commands::chords(
                &config,
                &inputs,
                commands::ChordsOverrides {
                    classifier,
                    out_dir,
                    merge_gap,
                    chord_gap,
                    similarity,
                    json,
                },
            )?;
        }
        Commands::Notes { input } => {
            commands::notes(&config, &input)?;
        }
        Commands::Exemplars { corpus, output } => {
            commands::exemplars(&corpus, &output)?;
        }
        Commands::Evaluate {
            corpus,
            classifier,
            output,
            precision_below,
        } => {
            commands::evaluate(&config, &corpus, classifier, output, precision_below)?;
        }
        Commands::Render {
            table,
            output,
            chord_ticks,
            tempo,
        } => {
            commands::render(&table, &output, chord_ticks, tempo)?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources);
        }
    }

    Ok(())
}
