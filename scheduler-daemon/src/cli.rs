use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scheduler-daemon", version, about = "Gang-aware fair-share scheduler daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the scheduling daemon with a config file.
    Start {
        #[arg(short, long)]
        config: PathBuf,
    },
}
