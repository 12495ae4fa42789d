use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flvm")]
#[command(about = "Stack bytecode virtual machine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program image
    Run {
        /// Path to the image
        path: PathBuf,
        /// Arguments passed to the program after the image path
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// TOML config file (defaults to ./flvm.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Value stack capacity
        #[arg(long)]
        stack_capacity: Option<usize>,
        /// Directory scanned for extension modules
        #[arg(long)]
        module_dir: Option<PathBuf>,
        /// Skip loading extension modules
        #[arg(long)]
        no_extensions: bool,
    },
    /// Print a listing of an image's instruction stream
    Disassemble {
        /// Path to the image
        path: PathBuf,
    },
}
