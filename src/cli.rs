// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use diskpush::output::OutputMode;
use diskpush::types::DiskAlias;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "diskpush")]
#[command(about = "Upload disk images to a virtualization management API")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new diskpush.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Show the detected format and sizes of an image file
    Detect {
        /// Image file to inspect
        file: PathBuf,
    },

    /// Upload an image file as a new disk
    Upload(UploadArgs),
}

#[derive(Args)]
pub struct UploadArgs {
    /// Image file to upload
    pub file: PathBuf,

    /// Name of the new disk
    #[arg(long)]
    pub alias: DiskAlias,

    /// Storage domain ID (overrides upload.storage_domain)
    #[arg(long)]
    pub storage_domain: Option<String>,

    /// Provision the disk thin
    #[arg(long, overrides_with = "no_sparse")]
    pub sparse: bool,

    /// Provision the disk preallocated
    #[arg(long, overrides_with = "sparse")]
    pub no_sparse: bool,

    /// Overall deadline, e.g. "90m" (overrides upload.timeout)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

impl UploadArgs {
    /// Explicit sparse choice, if either flag was given.
    pub fn sparse(&self) -> Option<bool> {
        match (self.sparse, self.no_sparse) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
