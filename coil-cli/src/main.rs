use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Command-line front end for the coil configuration language.
#[derive(Debug, Parser)]
#[command(name = "coil", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse and evaluate `file` (extends/deletions resolved, links and
    /// interpolation left lazy); prints the resulting tree in canonical
    /// string form, or a parse/evaluation error.
    Parse { file: PathBuf },
    /// Parse and fully expand `file`; prints the canonical string form.
    Eval { file: PathBuf },
    /// Parse and fully expand `file`, then print the value at `path`.
    Get { file: PathBuf, path: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Parse { file } => run_parse(&file),
        Command::Eval { file } => run_eval(&file),
        Command::Get { file, path } => run_get(&file, &path),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("coil: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_parse(file: &PathBuf) -> coil::Result<()> {
    let root = coil::parse_file(file)?;
    println!("{}", root);
    Ok(())
}

fn run_eval(file: &PathBuf) -> coil::Result<()> {
    let root = coil::parse_file(file)?;
    root.expand()?;
    println!("{}", root);
    Ok(())
}

fn run_get(file: &PathBuf, path: &str) -> coil::Result<()> {
    let root = coil::parse_file(file)?;
    let value = root.get(path)?;
    println!("{}", value);
    Ok(())
}
