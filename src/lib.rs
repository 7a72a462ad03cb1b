pub mod cli;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod errors;
pub mod ladder;
pub mod lifecycle;
pub mod services;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use log::info;

use crate::cli::{Cli, Command};
use crate::config::settings::AppConfig;
use crate::database::DbPool;
use crate::dispatch::{Dispatcher, LogBroadcastGateway, LogNotificationGateway};
use crate::lifecycle::engine::LadderEngine;
use crate::services::sweeper::SweeperService;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_init() -> Result<()> {
    let pool = open_pool()?;
    let conn = database::get_connection(&pool)?;

    database::setup::reset_database(&conn)?;
    let season = database::seasons::insert(&conn, 1, Utc::now())?;
    info!("season {} opened at {}", season.number, season.started_at);

    Ok(())
}

pub fn handle_add_player(
    name: &str,
    email: Option<&str>,
    chat_handle: Option<&str>,
) -> Result<()> {
    let config = AppConfig::new();
    let pool = open_pool()?;
    let engine = LadderEngine::new(pool, config.ladder.clone());

    let (profile, events) = engine.join_ladder(name, email, chat_handle)?;
    build_dispatcher(&config).deliver_all(&events);
    info!("{} registered at rank {}", name, profile.rank);

    Ok(())
}

pub fn handle_standings() -> Result<()> {
    let config = AppConfig::new();
    let pool = open_pool()?;
    let engine = LadderEngine::new(pool, config.ladder.clone());

    for (profile, player) in engine.standings()? {
        let movement = match profile.movement {
            m if m == ladder::rank_table::FOULED_MOVEMENT => " (balled)".to_string(),
            0 => String::new(),
            m => format!(" ({m:+})"),
        };
        println!("{:>3}  {}{}", profile.rank, player.name, movement);
    }

    Ok(())
}

pub fn handle_sweep() -> Result<()> {
    let config = AppConfig::new();
    let pool = open_pool()?;
    let engine = LadderEngine::new(pool, config.ladder.clone());

    let (swept, events) = engine.timeout_sweep()?;
    build_dispatcher(&config).deliver_all(&events);
    info!("forfeited {swept} expired match(es)");

    Ok(())
}

pub fn handle_watch(interval: Option<u64>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new();
        let interval_secs = interval.unwrap_or(config.sweep.interval_secs);
        let pool = open_pool()?;
        let engine = Arc::new(LadderEngine::new(pool, config.ladder.clone()));

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let dispatcher = Arc::new(build_dispatcher(&config));
        tokio::spawn(dispatcher.run(rx));

        let service = SweeperService::new(engine, tx, interval_secs);
        service.run().await
    })
}

fn open_pool() -> Result<DbPool> {
    let db_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "pool_ladder.db".to_string());
    database::create_pool(&db_path)
}

fn build_dispatcher(config: &AppConfig) -> Dispatcher {
    Dispatcher::new(
        config.ladder.name.clone(),
        Arc::new(LogBroadcastGateway),
        Arc::new(LogNotificationGateway),
    )
}
