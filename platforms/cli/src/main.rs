mod render;

use clap::Parser;
use render::{render_table, render_tape, View};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;
use tmsim::types::NULL_TOKEN;
use tmsim::{
    analyze, compile, Executable, Halt, MachineError, Mode, Program, ProgramLoader,
    ProgramManager, Status,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Delay between rendered steps for each speed setting, in milliseconds.
const DELAYS_MS: [u64; 11] = [2000, 1400, 1000, 800, 600, 400, 200, 100, 30, 10, 0];

/// Steps run between progress reports in fast mode.
const FAST_CHUNK: u64 = 10_000_000;

/// Exit code when the step budget runs out before the machine halts.
const EXIT_BUDGET: i32 = 2;

/// Log filter used when `RUST_LOG` is unset. The library and this binary share a target.
const DEFAULT_FILTER: &str = "warn,tmsim=info";

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// The program file to execute. Read from stdin when omitted and stdin is piped
    program: Option<PathBuf>,

    /// Run a built-in program instead of a file
    #[clap(short, long, conflicts_with = "program")]
    builtin: Option<String>,

    /// List the built-in programs and exit
    #[clap(short, long)]
    list: bool,

    /// Replace the program's tape section with the entries of this file
    #[clap(short, long)]
    tape: Option<PathBuf>,

    /// Run without drawing each step and without freeing tape blocks.
    /// Give twice to also skip the final tape
    #[clap(short, long, action = clap::ArgAction::Count)]
    fast: u8,

    /// Drawing speed from 0 (slowest) to 10 (no delay)
    #[clap(short, long, default_value_t = 7, value_parser = clap::value_parser!(u8).range(0..=10))]
    speed: u8,

    /// Draw cell borders around the tape
    #[clap(long)]
    frame: bool,

    /// Print the compiled transition table before running
    #[clap(long)]
    table: bool,

    /// Print a JSON summary when the run ends
    #[clap(long)]
    json: bool,

    /// Stop after this many steps if the machine has not halted
    #[clap(short, long)]
    max_steps: Option<u64>,
}

/// The final report printed with `--json`.
#[derive(Serialize)]
struct Summary<'a> {
    state: &'a str,
    status: &'static str,
    steps: u64,
    position: i64,
    blocks: usize,
    tape: Vec<&'a str>,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if cli.list {
        for name in ProgramManager::names() {
            println!("{}", name);
        }
        return;
    }

    let program = match load_program(&cli) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    for warning in analyze(&program) {
        warn!("{}", warning);
    }

    let mode = if cli.fast > 0 { Mode::Fast } else { Mode::Normal };
    let mut exe = match compile(&program, mode) {
        Ok(exe) => exe,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if cli.table {
        println!("{}\n", render_table(&exe));
    }

    let status = if cli.fast > 0 {
        run_fast(&mut exe, cli.max_steps)
    } else {
        run_drawn(&mut exe, &cli)
    };

    if cli.fast < 2 {
        println!("{}", render_tape(&exe, View::All, cli.frame));
    }

    if cli.json {
        match serde_json::to_string_pretty(&summary(&exe)) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("failed to serialize summary: {}", e),
        }
    }

    let code = match status {
        Status::Halted(halt) => {
            info!(steps = exe.step_count(), ?halt, "machine halted");
            exe.exit_code().unwrap_or(1)
        }
        Status::Running => {
            info!(steps = exe.step_count(), "step budget exhausted");
            EXIT_BUDGET
        }
    };
    process::exit(code);
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Loads the program from a built-in name, a file, or piped stdin, then applies `--tape`.
fn load_program(cli: &Cli) -> Result<Program, MachineError> {
    let mut program = if let Some(name) = &cli.builtin {
        ProgramManager::get(name)?
    } else if let Some(path) = &cli.program {
        ProgramLoader::load_program(path)?
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| MachineError::FileError(format!("Failed to read from stdin: {}", e)))?;
        ProgramLoader::load_program_from_string(&buffer)?
    } else {
        return Err(MachineError::ValidationError(
            "No program given. Pass a file, pipe one on stdin, or use --builtin (see --list)"
                .to_string(),
        ));
    };

    if let Some(path) = &cli.tape {
        let entries = ProgramLoader::load_tape(path)?;
        debug!(entries = entries.len(), "tape replaced");
        program.replace_tape(entries);
    }

    Ok(program)
}

/// Runs in large chunks, reporting progress between them.
fn run_fast(exe: &mut Executable, max_steps: Option<u64>) -> Status {
    let mut remaining = max_steps.unwrap_or(u64::MAX);

    while exe.status() == Status::Running && remaining > 0 {
        let chunk = remaining.min(FAST_CHUNK);
        let before = exe.step_count();
        exe.run_restricted(chunk);
        remaining -= chunk;

        if exe.status() == Status::Running {
            info!(
                steps = exe.step_count(),
                blocks = exe.tape().block_count(),
                "still running"
            );
        }
        debug!(taken = exe.step_count() - before, "chunk done");
    }

    exe.status()
}

/// Draws the tape after every step, waiting between steps according to `--speed`.
fn run_drawn(exe: &mut Executable, cli: &Cli) -> Status {
    let delay = Duration::from_millis(DELAYS_MS[usize::from(cli.speed)]);
    let mut remaining = cli.max_steps.unwrap_or(u64::MAX);

    println!("{}", render_tape(exe, View::Window, cli.frame));
    while exe.status() == Status::Running && remaining > 0 {
        let blocks = exe.tape().block_count();
        exe.step();
        remaining -= 1;

        if exe.tape().block_count() != blocks {
            debug!(
                blocks = exe.tape().block_count(),
                span = ?exe.tape().allocated(),
                "tape resized"
            );
        }

        println!("\n{}", render_tape(exe, View::Window, cli.frame));
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    exe.status()
}

fn summary(exe: &Executable) -> Summary<'_> {
    let tape = exe.tape();
    let tape_cells = match tape.content_bounds() {
        Some((first, last)) => (first..=last)
            .map(|pos| exe.symbol_at(pos).unwrap_or(NULL_TOKEN))
            .collect(),
        None => Vec::new(),
    };

    Summary {
        state: exe.state_name().unwrap_or(NULL_TOKEN),
        status: match exe.status() {
            Status::Running => "running",
            Status::Halted(Halt::Final) => "final",
            Status::Halted(Halt::Undefined) => "undefined",
        },
        steps: exe.step_count(),
        position: tape.position(),
        blocks: tape.block_count(),
        tape: tape_cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_targets_this_binary() {
        let targets: Vec<&str> = DEFAULT_FILTER
            .split(',')
            .filter_map(|directive| directive.split_once('='))
            .map(|(target, _)| target)
            .collect();

        assert_eq!(targets, vec![env!("CARGO_CRATE_NAME")]);
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
