use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ripvault")]
#[command(author, version, about = "Optical disc ripping and archiving service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the drive, rip new discs and archive them
    Start,

    /// Scan the disc in the drive and list its titles
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all workflows
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the confirmed name and year of a workflow
    Confirm {
        /// Disc UUID
        disc: String,

        /// Title id on the disc
        title: u32,

        /// Movie name
        #[arg(long)]
        name: String,

        /// Release year
        #[arg(long)]
        year: String,

        /// IMDb id
        #[arg(long)]
        imdb_id: Option<String>,
    },

    /// Retry archiving a ripped workflow (run while the service is stopped)
    Ingest {
        /// Disc UUID
        disc: String,

        /// Title id on the disc
        title: u32,
    },

    /// Move JSON stores into the SQLite database
    Migrate,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
