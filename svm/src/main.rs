//! Spool VM runner
//!
//! Loads a compiled artifact and executes it against the process's
//! stdin/stdout, passing any trailing arguments through to the program.

use clap::Parser;
use colored::Colorize;
use spool_asm::Artifact;
use std::fs;
use std::path::PathBuf;
use svm::Vm;

#[derive(Parser)]
#[command(name = "svm")]
#[command(about = "Spool VM - runs compiled Spool artifacts")]
#[command(version = "0.1.0")]
struct Cli {
    /// The artifact file to run
    artifact: PathBuf,

    /// Arguments passed to the program
    args: Vec<String>,

    /// Abort after this many instructions
    #[arg(long)]
    limit: Option<u64>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(message) = run(&cli) {
        eprintln!("{} {}", "error:".red(), message);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let bytes = fs::read(&cli.artifact)
        .map_err(|e| format!("cannot read {}: {}", cli.artifact.display(), e))?;
    let artifact = Artifact::from_bytes(&bytes).map_err(|e| e.to_string())?;

    let mut vm = Vm::new(artifact, cli.args.clone());
    if let Some(limit) = cli.limit {
        vm.set_step_limit(limit);
    }
    vm.run().map_err(|e| e.to_string())
}
