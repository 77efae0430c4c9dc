//! stacklang - line-oriented interpreter for StackLang
//!
//! Every line is one token. Literals are pushed onto the data stack;
//! commands run as soon as they land on top.
//!
//! Usage:
//!   stacklang                       # Interactive session
//!   stacklang -I prelude.stk        # Load a file first
//!   stacklang --batch < prog.stk    # Read tokens from stdin, stop on first error
//!   stacklang -l 100 -o out.stk     # Cap the stack, dump it to a file on exit
//!
//! The stack is only dumped when `-o` is given.
//!
//! Ctrl-C stops a running command without leaving the session. A second
//! Ctrl-C before anything noticed the first one (say, while blocked reading
//! stdin in batch mode) exits with status 130.

mod report;
mod session;

use clap::Parser as ClapParser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use session::Session;
use stacklang_core::{EngineConfig, Interrupt, LanguageError};
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use tracing::level_filters::LevelFilter;
use tracing::{debug, warn};

#[derive(ClapParser)]
#[command(name = "stacklang")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interpreter for the StackLang stack language", long_about = None)]
struct Args {
    /// Maximum number of elements on the data stack
    #[arg(short = 'l', long = "limit", value_name = "N")]
    limit: Option<usize>,

    /// Write the remaining stack to FILE on exit
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Load FILE before reading input, one token per line (repeatable)
    #[arg(short = 'I', long = "include", value_name = "FILE")]
    include: Vec<PathBuf>,

    /// Engine settings (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read tokens from stdin without prompting; stop at the first error
    #[arg(long)]
    batch: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    debug!(?config, "engine config");

    let mut session = Session::new(&config);
    if let Err(e) = install_interrupt_handler(session.interrupt()) {
        warn!("Could not install SIGINT handler: {}", e);
    }

    for path in &args.include {
        if let Err(e) = session.include(path) {
            fail(&e);
        }
    }

    let completed = if args.batch {
        run_batch(&mut session)
    } else {
        run_interactive(&mut session);
        true
    };

    if let Err(e) = write_output(&session, args.output.as_ref()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
    if !completed {
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Config file first, then command line overrides
fn load_config(args: &Args) -> Result<EngineConfig, LanguageError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(limit) = args.limit {
        config = config.with_stack_limit(limit);
    }
    Ok(config)
}

fn fail(err: &LanguageError) -> ! {
    eprint!("{}", report::render(err));
    process::exit(1);
}

/// Exit status for a process ended by SIGINT
#[cfg(unix)]
const SIGINT_EXIT: i32 = 130;

/// SIGINT raises the interrupt; a second one while it is still raised exits
///
/// The shutdown hook must be registered first so it sees the flag as it
/// was before this signal set it.
#[cfg(unix)]
fn install_interrupt_handler(interrupt: &Interrupt) -> io::Result<()> {
    use signal_hook::consts::SIGINT;
    use signal_hook::flag;

    flag::register_conditional_shutdown(SIGINT, SIGINT_EXIT, interrupt.flag())?;
    flag::register(SIGINT, interrupt.flag())?;
    Ok(())
}

#[cfg(not(unix))]
fn install_interrupt_handler(_interrupt: &Interrupt) -> io::Result<()> {
    warn!("Interrupting running commands is not supported on this platform");
    Ok(())
}

/// Returns false if a line failed
fn run_batch(session: &mut Session) -> bool {
    let stdin = io::stdin();
    for (index, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading stdin: {}", e);
                return false;
            }
        };
        if let Err(mut e) = session.submit(&line) {
            e.message = format!("{} (stdin:{})", e.message, index + 1);
            eprint!("{}", report::render(&e));
            return false;
        }
    }
    true
}

fn run_interactive(session: &mut Session) {
    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Error initializing readline: {}", e);
            process::exit(1);
        }
    };

    let history_file = history_file();
    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    println!(
        "StackLang {}. One token per line; Ctrl-D to exit.",
        env!("CARGO_PKG_VERSION")
    );

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                if let Err(e) = session.submit(&line) {
                    eprint!("{}", report::render(&e));
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }
}

fn history_file() -> Option<PathBuf> {
    home::home_dir().map(|d| d.join(".stacklang_history"))
}

/// Dump the stack to `output`, if one was asked for
fn write_output(session: &Session, output: Option<&PathBuf>) -> io::Result<()> {
    let Some(path) = output else {
        return Ok(());
    };
    debug!(path = %path.display(), "dump");
    let mut out = BufWriter::new(File::create(path)?);
    session.dump(&mut out)?;
    out.flush()
}
