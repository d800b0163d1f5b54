use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use trainer_bot::config;
use trainer_bot::db::{self, CatalogEntry};
use trainer_bot::model::MuscleGroup;

#[derive(Debug, Parser)]
#[command(author, version, about = "Print a trainer's catalog as JSON")]
struct Args {
    /// Path to YAML config file (used to locate the database)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Database URL; overrides the config file
    #[arg(long)]
    database_url: Option<String>,

    /// Telegram id of the trainer
    #[arg(long)]
    telegram_id: i64,
}

#[derive(Debug, Serialize)]
struct Export {
    telegram_id: i64,
    username: Option<String>,
    muscle_groups: Vec<MuscleGroup>,
    exercises: Vec<CatalogEntry>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let database_url = match args.database_url {
        Some(url) => url,
        None => config::load(Some(&args.config))?.database_url(),
    };

    let pool = db::init_pool(&database_url).await?;
    let user = db::get_user(&pool, args.telegram_id)
        .await?
        .ok_or_else(|| anyhow!("user {} not found", args.telegram_id))?;

    let export = Export {
        telegram_id: user.telegram_id,
        username: user.username,
        muscle_groups: db::get_muscle_groups(&pool, user.telegram_id).await?,
        exercises: db::get_exercises(&pool, user.telegram_id).await?,
    };
    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}
