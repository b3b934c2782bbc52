//! changewatch migrator
//!
//! Usage: `migrator [up | down [n] | status | seed]`
//!
//! `up` (the default) applies pending migrations, then registers the sources
//! listed under `[[monitor.sources]]`. `seed` only registers sources.

use changewatch_common::{
    config::AppConfig,
    db::{DbPool, Migrator, Repository},
    errors::{AppError, Result},
};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Up,
    Down(u32),
    Status,
    Seed,
}

fn parse_command(args: &[String]) -> Result<Command> {
    let usage = || AppError::Configuration {
        message: "usage: migrator [up | down [n] | status | seed]".to_string(),
    };

    match args {
        [] => Ok(Command::Up),
        [cmd] if cmd == "up" => Ok(Command::Up),
        [cmd] if cmd == "down" => Ok(Command::Down(1)),
        [cmd, n] if cmd == "down" => n.parse().map(Command::Down).map_err(|_| usage()),
        [cmd] if cmd == "status" => Ok(Command::Status),
        [cmd] if cmd == "seed" => Ok(Command::Seed),
        _ => Err(usage()),
    }
}

async fn seed(db: &DbPool, config: &AppConfig) -> Result<()> {
    let added = Repository::new(db.clone())
        .ensure_sources(&config.monitor.sources)
        .await?;

    info!(
        added,
        configured = config.monitor.sources.len(),
        "Seeded monitored sources"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level)),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;

    let db = DbPool::connect_with_retry(&config.database).await?;

    match command {
        Command::Up => {
            let applied = db.migrate().await?;
            info!(applied, "Migrations applied");
            seed(&db, &config).await?;
        }
        Command::Down(steps) => {
            Migrator::down(db.write(), Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => {
            Migrator::status(db.write()).await?;
        }
        Command::Seed => seed(&db, &config).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(&args(&[])).unwrap(), Command::Up);
        assert_eq!(parse_command(&args(&["up"])).unwrap(), Command::Up);
        assert_eq!(parse_command(&args(&["down"])).unwrap(), Command::Down(1));
        assert_eq!(parse_command(&args(&["down", "3"])).unwrap(), Command::Down(3));
        assert_eq!(parse_command(&args(&["status"])).unwrap(), Command::Status);
        assert_eq!(parse_command(&args(&["seed"])).unwrap(), Command::Seed);
    }

    #[test]
    fn test_rejects_unknown_command() {
        assert!(parse_command(&args(&["fresh"])).is_err());
        assert!(parse_command(&args(&["down", "many"])).is_err());
        assert!(parse_command(&args(&["up", "now"])).is_err());
    }
}
