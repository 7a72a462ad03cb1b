use anyhow::Result;

use pool_ladder::cli::Command;
use pool_ladder::{
    handle_add_player, handle_init, handle_standings, handle_sweep, handle_watch, interpret,
};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Init => handle_init(),
        Command::AddPlayer { name, email, chat_handle } => {
            handle_add_player(name, email.as_deref(), chat_handle.as_deref())
        }
        Command::Standings => handle_standings(),
        Command::Sweep => handle_sweep(),
        Command::Watch { interval } => handle_watch(*interval),
    }
}
