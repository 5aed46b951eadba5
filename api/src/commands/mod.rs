use std::{net::TcpListener, sync::Arc};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::{
    configuration::Settings, integrations::github::GithubProvider, jobs::JobContext,
    repository::Database, run_server, run_worker,
};

pub mod migrate;
pub mod sync;
pub mod user;

/// GHN backend server and associated commands. No subcommand does
/// anything `main.rs` couldn't inline; they exist so an operator can run
/// the HTTP server, the job workers, a one-off sync, or the schema
/// migration runner as separate processes/containers (§1 "CLI/Docker
/// scripts... exist but are straightforward").
#[derive(Parser)]
#[clap(version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server (§6 List/Bulk API).
    Serve,

    /// Run the three durable job workers (§5 Queue configuration).
    Worker,

    /// Run the schema migration runner against the configured database.
    Migrate,

    /// Trigger a sync pass without waiting for the scheduler (§4.10).
    Sync {
        #[clap(subcommand)]
        command: SyncCommands,
    },

    /// Manage the singleton user row (§3 User).
    User {
        #[clap(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Enqueue one Fetch-New job (§4.10).
    New,
    /// Enqueue one Fetch-Older job over `[until - days, until)` (§4.10).
    Older {
        #[clap(long, default_value_t = 30)]
        days: i64,
        /// RFC3339 timestamp; defaults to now.
        #[clap(long)]
        until: Option<DateTime<Utc>>,
        #[clap(long)]
        max_count: Option<u32>,
        #[clap(long)]
        unread_only: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create the singleton user (fails if one already exists).
    Create {
        #[clap(long)]
        username: String,
        #[clap(long)]
        password_hash: String,
    },
    /// Show the singleton user's sync settings.
    Show,
}

impl Cli {
    pub fn log_directive(&self, settings: &Settings) -> String {
        match self.verbose {
            1 => log::LevelFilter::Info.to_string(),
            2 => log::LevelFilter::Debug.to_string(),
            n if n > 2 => log::LevelFilter::Trace.to_string(),
            _ => settings.application.log_directive.clone(),
        }
    }

    /// Dispatches the parsed command. `database` and `provider` are always
    /// built by `main.rs` before this is called; `redis_url` is only
    /// needed by `Serve`/`Worker`/`Sync` (anything that touches a queue).
    pub async fn execute(
        &self,
        settings: Settings,
        database: Database,
        provider: Arc<GithubProvider>,
    ) -> anyhow::Result<()> {
        match &self.command {
            Commands::Migrate => migrate::run(&database).await,

            Commands::Serve => {
                info!("Connecting to Redis for job queuing on {}", settings.redis.connection_string());
                let queues = Arc::new(crate::build_job_queues(&settings.redis.connection_string()).await?);
                let redis_client = redis::Client::open(settings.redis.connection_string())?;
                let listener = TcpListener::bind(("0.0.0.0", settings.application.port))?;
                info!("Starting HTTP server on port {}", settings.application.port);
                run_server(listener, settings, database, redis_client, queues)?.await?;
                Ok(())
            }

            Commands::Worker => {
                info!("Connecting to Redis for job queuing on {}", settings.redis.connection_string());
                let queues = Arc::new(crate::build_job_queues(&settings.redis.connection_string()).await?);
                let context = JobContext { database: Arc::new(database), provider };
                let _scheduler =
                    crate::jobs::sync::spawn_scheduler(queues.clone(), settings.sync.fetch_new_interval_secs);
                let monitor = run_worker(&settings, context, queues).await?;
                monitor.run_with_signal(tokio::signal::ctrl_c()).await?;
                Ok(())
            }

            Commands::Sync { command } => {
                let queues = Arc::new(crate::build_job_queues(&settings.redis.connection_string()).await?);
                match command {
                    SyncCommands::New => sync::enqueue_fetch_new(&queues).await,
                    SyncCommands::Older { days, until, max_count, unread_only } => {
                        let until = until.unwrap_or_else(Utc::now);
                        sync::enqueue_fetch_older(&queues, *days, until, *max_count, *unread_only).await
                    }
                }
            }

            Commands::User { command } => match command {
                UserCommands::Create { username, password_hash } => {
                    user::create_user(&database, username, password_hash).await
                }
                UserCommands::Show => user::show_user(&database).await,
            },
        }
    }
}
