//! Brainfuck-to-Spool Compiler Driver
//!
//! Command-line entry point: reads a source file, compiles it with the
//! configured cell range and I/O mode, and writes the Spool artifact.
//! Nothing is written when any stage fails.

use bfc_codegen::{compile, CompileConfig, IoMode};
use bfc_common::CompilerError;
use clap::{Parser, ValueEnum};
use log::info;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bfc")]
#[command(about = "Brainfuck-to-Spool compiler")]
#[command(version = "0.1.0")]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Output artifact file (defaults to the input stem with .spool)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Lower bound of the cell range
    #[arg(long, default_value_t = i64::MIN, allow_hyphen_values = true)]
    cell_min: i64,

    /// Upper bound of the cell range
    #[arg(long, default_value_t = i64::MAX, allow_hyphen_values = true)]
    cell_max: i64,

    /// Value the generated program reads once input is exhausted
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    eof: i32,

    /// Where the generated program reads input from
    #[arg(long, value_enum, default_value_t = IoChoice::Argument)]
    io: IoChoice,

    /// Also write a JSON rendering of the artifact for inspection
    #[arg(long)]
    emit_json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum IoChoice {
    /// Input comes from the program's command-line arguments
    Argument,
    /// Input is read interactively from the standard input stream
    Interactive,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CompilerError> {
    if cli.cell_min > cli.cell_max {
        return Err(CompilerError::codegen(format!(
            "cell range is empty: {} > {}",
            cli.cell_min, cli.cell_max
        )));
    }
    if cli.cell_min > 0 || cli.cell_max < 0 {
        return Err(CompilerError::codegen(
            "cell range must straddle zero".to_string(),
        ));
    }

    let source = fs::read_to_string(&cli.input)?;
    let nodes = bfc_frontend::parse(&source)?;

    let config = CompileConfig {
        cell_min: cli.cell_min,
        cell_max: cli.cell_max,
        eof: cli.eof,
        io: match cli.io {
            IoChoice::Argument => IoMode::Argument,
            IoChoice::Interactive => IoMode::Interactive,
        },
    };
    let artifact = compile(&nodes, &config)?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("spool"));
    fs::write(&output, artifact.to_bytes())?;
    info!("wrote {}", output.display());

    if cli.emit_json {
        let json_path = output.with_extension("spool.json");
        let rendered = serde_json::to_string_pretty(&artifact)
            .map_err(|e| CompilerError::codegen(e.to_string()))?;
        fs::write(&json_path, rendered)?;
        info!("wrote {}", json_path.display());
    }

    Ok(())
}
