use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "pool ladder ranking engine")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create the database schema and open season 1
    Init,
    /// Register a player at the bottom of the ladder
    AddPlayer {
        name: String,
        /// Where challenge notifications are mailed
        #[arg(short, long)]
        email: Option<String>,
        /// Chat handle used for @-mentions
        #[arg(short, long)]
        chat_handle: Option<String>,
    },
    /// Print the active ladder in rank order
    Standings,
    /// Forfeit expired challenges once and exit
    Sweep,
    /// Run the timeout sweep periodically
    Watch {
        /// Seconds between sweeps (optional, defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}
