//! `pollynom` command line: check and evaluate expressions, create puzzles
//! and play one round on the console.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colored::*;
use thiserror::Error;

use pollynom::dots::{DEFAULT_BAD_DOTS, DEFAULT_GOOD_DOTS};
use pollynom::{
    parse, Board, BoardError, Coordinator, DiskRepository, DotGenerationError, DotGenerator, DotKind,
    FixedDotGenerator, PersistenceError, PlotSettings, PlotSurface, PlotUpdate, RandomDotGenerator,
    Repository, SettingsError, SlotError,
};

// =============================================================================
// CONFIGURATION
// =============================================================================
const ZERO_THRESHOLD: f64 = 1e-10;

// =============================================================================
// ARGUMENTS
// =============================================================================
#[derive(Parser)]
#[command(version, about = "PollyNom: hit the good dots with the graphs of your functions")]
struct Cli {
    #[command(flatten)]
    window: WindowArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct WindowArgs {
    /// JSON file with plot settings
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Number of samples across the x-range
    #[arg(long, global = true)]
    samples: Option<usize>,

    #[arg(long, global = true, allow_negative_numbers = true)]
    x_min: Option<f64>,

    #[arg(long, global = true, allow_negative_numbers = true)]
    x_max: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an expression and print its canonical form
    Check {
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },
    /// Evaluate an expression at the given positions
    Eval {
        #[arg(allow_hyphen_values = true)]
        expression: String,
        #[arg(long = "at", required = true, num_args = 1.., allow_negative_numbers = true)]
        at: Vec<f64>,
    },
    /// Generate a random puzzle and save it
    New {
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_GOOD_DOTS)]
        good: usize,
        #[arg(long, default_value_t = DEFAULT_BAD_DOTS)]
        bad: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Plot functions against a puzzle and report the score
    Play {
        /// Saved game to load
        #[arg(long, value_name = "FILE")]
        game: Option<PathBuf>,
        /// Function for the next slot; repeat for more slots
        #[arg(short = 'f', long = "function", allow_hyphen_values = true)]
        functions: Vec<String>,
        #[arg(long)]
        seed: Option<u64>,
        /// Use the built-in puzzle instead of random dots
        #[arg(long, conflicts_with = "seed")]
        fixed: bool,
        /// Save the played game
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Dots(#[from] DotGenerationError),
    #[error(transparent)]
    Board(#[from] BoardError),
}

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================
fn format_val(val: f64) -> String {
    if val.abs() < ZERO_THRESHOLD {
        return "0".to_string();
    }
    let rounded = (val * 1_000_000.0).round() / 1_000_000.0;
    let s = format!("{:.6}", rounded);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

fn load_settings(args: &WindowArgs) -> Result<PlotSettings, CliError> {
    let mut settings = match &args.settings {
        Some(path) => PlotSettings::from_json(&fs::read_to_string(path).map_err(SettingsError::Io)?)?,
        None => PlotSettings::default(),
    };
    if let Some(samples) = args.samples {
        settings.sample_count = samples;
    }
    if let Some(x_min) = args.x_min {
        settings.x_min = x_min;
    }
    if let Some(x_max) = args.x_max {
        settings.x_max = x_max;
    }
    settings.validate()?;
    Ok(settings)
}

fn path_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// =============================================================================
// CONSOLE SURFACE
// =============================================================================
struct ConsoleSurface;

impl PlotSurface for ConsoleSurface {
    fn show_plot(&mut self, update: &PlotUpdate) {
        println!("{}", format!("=== GENERATION {} ===", update.generation).magenta().bold());

        for graph in &update.graphs {
            let label = format!("Slot {}: ", graph.slot);
            if graph.text.trim().is_empty() {
                println!("{}{}", label.dimmed(), "(empty)".dimmed());
                continue;
            }
            let points: usize = graph.segments.iter().map(|s| s.len()).sum();
            println!(
                "{}{}  {}",
                label.cyan().bold(),
                graph.text.cyan(),
                format!("{} segments, {} points", graph.segments.len(), points).dimmed()
            );
            for segment in &graph.segments {
                if let Some((lo, hi)) = segment.x_range() {
                    println!("    {}", format!("x in [{}, {}]", format_val(lo), format_val(hi)).dimmed());
                }
            }
        }

        println!("{}", "Dots:".white().bold());
        for dot in &update.dots {
            let position = format!("({}, {})", format_val(dot.x()), format_val(dot.y()));
            let line = match (dot.kind(), dot.is_hit()) {
                (DotKind::Good, true) => format!("good {position} hit").green(),
                (DotKind::Bad, true) => format!("bad  {position} hit").red(),
                (DotKind::Good, false) => format!("good {position} missed").dimmed(),
                (DotKind::Bad, false) => format!("bad  {position} avoided").dimmed(),
            };
            println!("  {line}");
        }

        let score = format!("Score: {}", update.score);
        if update.score < 0 {
            println!("{}", score.red().bold());
        } else {
            println!("{}", score.green().bold());
        }
    }

    fn show_errors(&mut self, errors: &[SlotError]) {
        for error in errors {
            println!(
                "{}",
                format!("Slot {}: {} at position {}", error.slot, error.message, error.offset).red()
            );
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================
fn check(expression: &str) -> ExitCode {
    println!("{}{}", "Input: ".cyan().bold(), expression.cyan());
    match parse(expression) {
        Ok(expr) => {
            println!("{}{}", "Parsed: ".green(), expr.to_string().green());
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}{}", "Error: ".red(), err.message().red());
            println!("  {expression}");
            println!("  {}{}", " ".repeat(err.offset()), "^".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn eval(expression: &str, at: &[f64]) -> ExitCode {
    let expr = match parse(expression) {
        Ok(expr) => expr,
        Err(err) => {
            println!("{}{}", "Error: ".red(), err.to_string().red());
            return ExitCode::FAILURE;
        }
    };
    for &x in at {
        let label = format!("x = {}: ", format_val(x));
        match expr.eval(x) {
            Ok(y) => println!("{}{}", label.dimmed(), format_val(y).green()),
            Err(reason) => println!("{}{}", label.dimmed(), format!("undefined ({reason})").yellow()),
        }
    }
    ExitCode::SUCCESS
}

fn new_game(
    settings: &PlotSettings,
    out: &Path,
    good: usize,
    bad: usize,
    seed: Option<u64>,
) -> Result<ExitCode, CliError> {
    let mut generator = match seed {
        Some(seed) => RandomDotGenerator::new(good, bad, seed),
        None => RandomDotGenerator::from_entropy(good, bad),
    };
    let board = Board::new(generator.generate()?, settings.slot_count);
    let mut repository = DiskRepository::default();
    repository.save(&board, &path_id(out))?;
    println!(
        "{}{}",
        "Saved new puzzle: ".green(),
        repository.path_for(&path_id(out)).display().to_string().green()
    );
    Ok(ExitCode::SUCCESS)
}

fn play(
    settings: PlotSettings,
    game: Option<&Path>,
    functions: &[String],
    seed: Option<u64>,
    fixed: bool,
    save: Option<&Path>,
) -> Result<ExitCode, CliError> {
    let mut repository = DiskRepository::default();
    let mut coordinator = match game {
        Some(path) => {
            let board = Board::new(Vec::new(), settings.slot_count);
            let mut coordinator = Coordinator::new(board, settings)?;
            coordinator.load_game(&repository, &path_id(path))?;
            coordinator
        }
        None => {
            let dots = if fixed {
                FixedDotGenerator::default().generate()?
            } else {
                match seed {
                    Some(seed) => RandomDotGenerator::new(DEFAULT_GOOD_DOTS, DEFAULT_BAD_DOTS, seed),
                    None => RandomDotGenerator::from_entropy(DEFAULT_GOOD_DOTS, DEFAULT_BAD_DOTS),
                }
                .generate()?
            };
            Coordinator::with_dots(dots, settings)?
        }
    };

    if !functions.is_empty() {
        coordinator.set_texts(functions)?;
    }
    coordinator.request_recompute();
    coordinator.wait();
    coordinator.publish(&mut ConsoleSurface);
    coordinator.acknowledge();

    if let Some(path) = save {
        coordinator.save_game(&mut repository, &path_id(path))?;
        println!(
            "{}{}",
            "Saved game: ".green(),
            repository.path_for(&path_id(path)).display().to_string().green()
        );
    }
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================
fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match cli.command {
        Command::Check { expression } => Ok(check(&expression)),
        Command::Eval { expression, at } => Ok(eval(&expression, &at)),
        Command::New { out, good, bad, seed } => new_game(&load_settings(&cli.window)?, &out, good, bad, seed),
        Command::Play {
            game,
            functions,
            seed,
            fixed,
            save,
        } => play(
            load_settings(&cli.window)?,
            game.as_deref(),
            &functions,
            seed,
            fixed,
            save.as_deref(),
        ),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}{}", "Error: ".red().bold(), err.to_string().red());
            ExitCode::FAILURE
        }
    }
}
