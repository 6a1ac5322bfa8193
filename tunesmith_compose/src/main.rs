// Tunesmith composer CLI entry point.
//
// Composes a piece from command-line parameters (optionally layered over a
// JSON parameter file) and writes it to MIDI. The pipeline: resolve
// parameters -> compose (markov / rule / hybrid) -> MIDI output.
//
// Usage:
//   cargo run -p tunesmith_compose --bin generate -- [output.mid] --genre Pop
//     [--scale "C Major"] [--mood Happy] [--tempo Medium] [--length Short]
//     [--complexity Simple] [--mode hybrid] [--instrument Piano ...]
//     [--progression N] [--params FILE] [--matrices FILE] [--seed N] [--json]
//
// Flags override values from --params. Without --seed (here or in the
// parameter file) a seed is derived from the clock and printed so the run
// can be reproduced.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tunesmith_compose::matrix::TransitionMatrixTable;
use tunesmith_compose::midi::write_midi;
use tunesmith_compose::{Composer, CompositionParameters};
use tunesmith_prng::ComposeRng;

#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compose a short multi-instrument piece and write it as MIDI", long_about = None)]
struct Args {
    /// Output MIDI file.
    #[arg(value_name = "FILE", default_value = "output.mid")]
    output: PathBuf,

    /// JSON file with composition parameters; flags override its values.
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// JSON file with a custom transition matrix table.
    #[arg(long, value_name = "FILE")]
    matrices: Option<PathBuf>,

    #[arg(short, long)]
    genre: Option<String>,

    /// Scale such as "C Major" or "F# Pentatonic Minor".
    #[arg(short, long)]
    scale: Option<String>,

    #[arg(long)]
    mood: Option<String>,

    /// Slow, Medium or Fast.
    #[arg(short, long)]
    tempo: Option<String>,

    /// Short, Medium or Long.
    #[arg(short, long)]
    length: Option<String>,

    /// Simple, Intermediate or Complex.
    #[arg(short, long)]
    complexity: Option<String>,

    /// markov, rule or hybrid.
    #[arg(short, long)]
    mode: Option<String>,

    /// Instrument name; repeat for several.
    #[arg(short, long = "instrument", value_name = "NAME")]
    instruments: Vec<String>,

    /// Index of the genre's progression variant.
    #[arg(long)]
    progression: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Also print the composition as JSON.
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Parameters from the file (if any) with flags layered on top.
    fn parameters(&self) -> Result<CompositionParameters> {
        let mut params = match &self.params {
            Some(path) => CompositionParameters::load(path)
                .with_context(|| format!("failed to load parameters from {}", path.display()))?,
            None => CompositionParameters::default(),
        };
        let overrides = [
            (&mut params.genre, &self.genre),
            (&mut params.scale, &self.scale),
            (&mut params.mood, &self.mood),
            (&mut params.tempo, &self.tempo),
            (&mut params.length, &self.length),
            (&mut params.complexity, &self.complexity),
            (&mut params.mode, &self.mode),
        ];
        for (slot, flag) in overrides {
            if flag.is_some() {
                slot.clone_from(flag);
            }
        }
        if !self.instruments.is_empty() {
            params.instruments = self.instruments.clone();
        }
        if self.progression.is_some() {
            params.progression = self.progression;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }
        Ok(params)
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let params = args.parameters()?;
    let seed = params.seed.unwrap_or_else(clock_seed);

    println!("=== Tunesmith Composer ===");
    println!("Output: {}", args.output.display());
    println!("Seed: {}", seed);
    println!();

    println!("[1/3] Loading transition matrices...");
    let matrices = match &args.matrices {
        Some(path) => {
            let table = TransitionMatrixTable::load(path)
                .with_context(|| format!("failed to load matrices from {}", path.display()))?;
            println!("  Loaded {} (genre, mood) entries.", table.entries.len());
            table
        }
        None => {
            println!("  Using built-in matrices.");
            TransitionMatrixTable::builtin()
        }
    };
    let composer = Composer::new(matrices);

    println!("[2/3] Composing...");
    let mut rng = ComposeRng::new(seed);
    let composition = composer
        .generate(&params, &mut rng)
        .context("composition failed")?;
    let p = &composition.parameters;
    println!("  Genre: {}  Scale: {}  Mood: {}", p.genre, p.scale, p.mood);
    println!(
        "  Mode: {:?}  Tempo: {:?} ({} BPM)  Complexity: {:?}",
        p.mode,
        p.tempo,
        composition.bpm(),
        p.complexity
    );
    println!("  Instruments: {}", p.instruments.join(", "));
    println!(
        "  {} bars, {} melody events",
        composition.bar_count(),
        composition.melody.len()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&composition)?);
    }

    println!("[3/3] Writing MIDI to {}...", args.output.display());
    write_midi(&composition, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    let whole_notes: f64 = composition.melody.iter().map(|e| e.duration).sum();
    let seconds = whole_notes * 4.0 * 60.0 / f64::from(composition.bpm());
    println!("  Done! Melody duration: {:.0}s", seconds);

    println!();
    println!("Play with: timidity {} (or any MIDI player)", args.output.display());
    Ok(())
}
