use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use waypoint::auth::{hash_password, validate_login};
use waypoint::config::Config;
use waypoint::models::Page;
use waypoint::storage::{SqliteStorage, Storage, StorageError, UserStore, VisitRecorder};

#[derive(Parser)]
#[command(name = "waypoint-admin")]
#[command(about = "Waypoint admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema if it does not exist
    Migrate,
    /// Create a management user
    CreateUser {
        username: String,
        /// Password; falls back to the APP_PASSWORD environment variable
        #[arg(long, env = "APP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Print recorded visits
    Visits {
        #[arg(long, default_value_t = 1)]
        start: i64,
        #[arg(long, default_value_t = 20)]
        length: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    // Only the database section matters here
    let config = Config::load()?;

    let storage =
        SqliteStorage::new(&config.database.url, config.database.max_connections).await?;

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::Migrate => {
            println!("✓ Schema is up to date at {}", config.database.url);
        }
        Commands::CreateUser { username, password } => {
            let Some(password) = password else {
                bail!("no password given: pass --password or set APP_PASSWORD");
            };
            validate_login(&username, &password)?;

            let hash = hash_password(&password)?;
            match storage.create_user(&username, &hash).await {
                Ok(id) => println!("✓ Created user '{}' with id {}", username, id),
                Err(StorageError::Conflict) => bail!("user '{}' already exists", username),
                Err(err) => return Err(err).context("failed to create user"),
            }
        }
        Commands::Visits { start, length } => {
            let page = Page::new(start, length)?;
            let visits = storage.list_visits(page).await?;
            if visits.is_empty() {
                println!("No visits recorded.");
            } else {
                println!(
                    "{:<8} {:<20} {:<40} {:<16} {:<12} {}",
                    "ID", "Time (UTC)", "IP", "OS", "Platform", "Browser"
                );
                println!("{}", "-".repeat(120));
                for visit in visits {
                    let time = DateTime::from_timestamp(visit.created_at, 0)
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    println!(
                        "{:<8} {:<20} {:<40} {:<16} {:<12} {}",
                        visit.id, time, visit.ip, visit.os, visit.platform, visit.browser
                    );
                }
            }
        }
    }

    storage.close().await;
    Ok(())
}
