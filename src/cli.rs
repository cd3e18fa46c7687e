use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(version, about = None, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Entry source file; sibling modules are looked up next to it
    pub input_file: PathBuf,

    /// Directory for the generated Python files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Execution mode
    #[arg(value_enum)]
    #[arg(short, long)]
    #[arg(default_value_t = Mode::Compile)]
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Compile the source code to Python
    Compile,

    /// Inspect the AST of the parsed source code
    Parse,

    /// Report diagnostics without emitting anything
    Check,

    /// Compile to a temporary directory and run with python3
    Run,
}
