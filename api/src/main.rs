use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::ConnectOptions;
use tracing::{error, info};

use ghn_api::{
    commands::Cli,
    configuration::Settings,
    integrations::github::GithubProvider,
    observability::{get_subscriber, init_subscriber},
    repository::Database,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    color_backtrace::install();

    let cli = Cli::parse();
    let settings = Settings::new().expect("Cannot load GHN configuration");

    let log_directive = cli.log_directive(&settings);
    let subscriber = get_subscriber(&log_directive);
    init_subscriber(subscriber, log_directive.parse().unwrap_or(log::LevelFilter::Info));

    info!("Connecting to PostgreSQL on {}", settings.database.safe_connection_string());
    let options = PgConnectOptions::new()
        .username(&settings.database.username)
        .password(&settings.database.password)
        .host(&settings.database.host)
        .port(settings.database.port)
        .database(&settings.database.database_name)
        .log_statements(log::LevelFilter::Debug);
    let pool = Arc::new(
        PgPoolOptions::new()
            .max_connections(settings.database.max_connections)
            .connect_with(options)
            .await
            .expect("Failed to connect to Postgres"),
    );
    let database = Database::new(pool);

    let provider = Arc::new(
        GithubProvider::new(
            &settings.github.auth_token,
            settings.github.base_url.clone(),
            settings.github.page_size,
        )
        .expect("Failed to build the GitHub provider"),
    );

    match cli.execute(settings, database, provider).await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("ghn-api failed: {err:?}");
            Err(err)
        }
    }
}
