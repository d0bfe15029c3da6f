//! Command-line argument definitions for the storyframe CLI.

use clap::Parser;

use frame_core::RigidEndStrategy;

/// Translate a story model into a validated frame model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input model text
    #[arg(help = "Path to the input model file")]
    pub input: String,

    /// Path to the artifact JSON to write
    #[arg(short, long, default_value = "model.frame.json")]
    pub output: String,

    /// Path to a build configuration file (TOML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Rigid end strategy (joint_offset, split_segments); overrides the config file
    #[arg(short, long)]
    pub strategy: Option<RigidEndStrategy>,

    /// Command that receives the artifact JSON on stdin for a solver check
    #[arg(long)]
    pub runtime: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
