//! chordsmith: generate chord, melody and bassline patterns from the command line

mod commands;

use std::path::PathBuf;

use chordsmith_core::{ChordType, ProgressionStyle};
use chordsmith_services::{Quantize, TemplateScope};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "chordsmith", version, about = "Generate chord, melody and bassline patterns")]
struct Cli {
    /// Template store (JSON). Defaults to the user data directory.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Preferences file (TOML). Defaults to the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Chord pattern following a progression
    Chords {
        #[command(flatten)]
        common: GenerateArgs,
        #[arg(long, default_value_t = ProgressionStyle::Pop)]
        style: ProgressionStyle,
        /// Accepted for compatibility; chord qualities come from the progression
        #[arg(long, default_value_t = ChordType::Major)]
        chord_type: ChordType,
        /// 0 = triads, 1 = sevenths
        #[arg(long, default_value_t = 0.5)]
        complexity: f64,
        /// 0 = consonant, 1 = dissonant
        #[arg(long, default_value_t = 0.5)]
        tension: f64,
    },
    /// Random melody on the C major scale
    Melody {
        #[command(flatten)]
        common: GenerateArgs,
    },
    /// C-F-G-A bassline
    Bassline {
        #[command(flatten)]
        common: GenerateArgs,
    },
    /// Manage saved templates
    #[command(subcommand)]
    Templates(TemplateCommand),
    /// Show or change preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// 0.0 to 1.0 (default from preferences)
    #[arg(long)]
    density: Option<f64>,
    /// 1 to 7 (default from preferences)
    #[arg(long)]
    octave: Option<i32>,
    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
    /// Print the playback schedule at the preferred tempo
    #[arg(long)]
    play: bool,
    /// Save the pattern as a template with this name
    #[arg(long)]
    save: Option<String>,
}

#[derive(Debug, Subcommand)]
enum TemplateCommand {
    /// List templates
    List {
        #[arg(long)]
        scope: Option<TemplateScope>,
        #[arg(long)]
        favorites: bool,
    },
    /// Print a template as JSON
    Show { id: String },
    /// Print the last used template for a scope
    Last { scope: TemplateScope },
    Delete { id: String },
    Rename { id: String, name: String },
    Duplicate { id: String },
    /// Toggle the favorite flag
    Favorite { id: String },
}

#[derive(Debug, Subcommand)]
enum PrefsCommand {
    Show,
    Set {
        #[arg(long)]
        density: Option<f64>,
        #[arg(long)]
        octave: Option<i32>,
        #[arg(long)]
        bpm: Option<f64>,
        #[arg(long)]
        quantize: Option<Quantize>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries pattern JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("chordsmith=info".parse()?))
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context::new(cli.store, cli.config);

    match cli.command {
        Command::Chords { common, style, chord_type, complexity, tension } => {
            let options = commands::ChordOptions { style, chord_type, complexity, tension };
            commands::generate(&ctx, chordsmith_core::PatternKind::Chord, &common, Some(options))
        }
        Command::Melody { common } => {
            commands::generate(&ctx, chordsmith_core::PatternKind::Melody, &common, None)
        }
        Command::Bassline { common } => {
            commands::generate(&ctx, chordsmith_core::PatternKind::Bassline, &common, None)
        }
        Command::Templates(cmd) => commands::templates(&ctx, cmd),
        Command::Prefs(cmd) => commands::prefs(&ctx, cmd),
    }
}
