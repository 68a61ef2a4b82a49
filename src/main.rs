//! Blockscript - block-diagram language runner
//!
//! Runs a program and prints what it writes.
//!
//! # Usage
//!
//! ```bash
//! blockscript model.bs
//! blockscript --diagram model.json
//! blockscript --diagram model.json --emit-source
//! blockscript model.bs --timeout 5 --precision 3
//! ```

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use log::info;

use blockscript_core::{
    diagram, dsl,
    error::Result,
    executor::{run_isolated, run_source},
    interp::DEFAULT_PRECISION,
    EngineConfig,
};

/// Block-diagram language runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the program file, or the diagram JSON with --diagram
    #[arg(value_name = "FILE", required_unless_present = "worker")]
    file: Option<PathBuf>,

    /// Treat FILE as a JSON diagram and translate it before running
    #[arg(short, long)]
    diagram: bool,

    /// Print the translated program instead of running it
    #[arg(long, requires = "diagram")]
    emit_source: bool,

    /// Run in a separate process and stop it after this many seconds
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Decimal places of printed numbers
    #[arg(short, long, default_value_t = DEFAULT_PRECISION)]
    precision: u32,

    /// Read a program from standard input and run it (used by --timeout)
    #[arg(long, hide = true)]
    worker: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = EngineConfig::new().with_precision(Some(args.precision));

    if args.worker {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        return emit(&run_source(&source, &config));
    }

    let Some(path) = args.file.as_deref() else {
        Args::command()
            .error(clap::error::ErrorKind::MissingRequiredArgument, "FILE is required")
            .exit();
    };

    let mut source = dsl::read_source(path)?;
    if args.diagram {
        source = diagram::translate(&source)?;
        info!("translated diagram {}", path.display());
        if args.emit_source {
            return emit(&source);
        }
    }

    let output = match args.timeout {
        Some(secs) => {
            let program = std::env::current_exe()?;
            run_isolated(&program, &source, Duration::from_secs(secs), args.precision)?
        }
        None => run_source(&source, &config),
    };
    emit(&output)
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
