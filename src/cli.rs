//! Command-line interface for tictactoe_rooms.

use clap::{Parser, Subcommand};

/// Two-player tic-tac-toe session server
#[derive(Parser, Debug)]
#[command(name = "tictactoe_rooms")]
#[command(about = "Real-time two-player tic-tac-toe over WebSockets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the session server
    Serve {
        /// Port to bind to (overrides config file and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config file and HOST)
        #[arg(long)]
        host: Option<String>,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,
    },

    /// Print the effective configuration and exit
    Config {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,
    },
}
