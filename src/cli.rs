use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Engine configuration (.json); defaults apply when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Content root; overrides the configured one
    #[arg(long, global = true)]
    pub content: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a map and compile every NPC script it references
    Check { map: String },
    /// Print the render batch summary of a map
    Batches { map: String },
    /// Write an empty map filled with one floor tile
    New {
        name: String,
        width: u32,
        height: u32,
        #[arg(long, default_value_t = 1)]
        tile: u32,
        #[arg(long, default_value = "default")]
        tileset: String,
    },
    /// Compile a script and print its op listing
    Script { name: String },
}
