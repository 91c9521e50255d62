use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Script source file
    pub input: PathBuf,
    /// JSON file with host command/identifier/variable/flag tables
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Artifact to write; defaults to a listing unless --run is given
    #[arg(short, long, value_enum)]
    pub emit: Option<Emit>,
    /// Write the artifact here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Execute the script, from LABEL if given, host commands as dry runs
    #[arg(short, long, value_name = "LABEL", num_args = 0..=1)]
    pub run: Option<Option<String>>,
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emit {
    Listing,
    Json,
}
