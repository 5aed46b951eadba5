use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use anyhow::Context;
use apalis::prelude::{Monitor, OnFailure, WorkerBuilder, WorkerFactoryFn};
use apalis_redis::RedisStorage;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub mod commands;
pub mod configuration;
pub mod error;
pub mod integrations;
pub mod jobs;
pub mod observability;
pub mod repository;
pub mod routes;
pub mod rule_engine;
pub mod services;

pub use error::{GhnApiError, GhnApiResult};

use configuration::Settings;
use integrations::Provider;
use jobs::{apply_rule::ApplyRuleJob, process::ProcessNotificationJob, sync::SyncJob, JobContext};
use repository::Database;

/// The three durable queues bundled as one value, injected as app data and
/// job data so handlers on either side of the HTTP/worker boundary enqueue
/// through the same `JobQueues::enqueue_*` helpers (§5, §11).
pub use jobs::sync::JobQueues;

/// Builds the three `RedisStorage` handles, namespaced under one Redis
/// connection, mirroring the teacher's `RedisStorage::new_with_config`
/// wiring in `main.rs`.
pub async fn build_job_queues(redis_url: &str) -> anyhow::Result<JobQueues> {
    let conn = apalis_redis::connect(redis_url.to_string())
        .await
        .context("Failed to connect to Redis for the job queues")?;

    let sync_notifications = RedisStorage::new_with_config(
        conn.clone(),
        apalis_redis::Config::default().set_namespace(jobs::QUEUE_SYNC_NOTIFICATIONS),
    );
    let process_notification = RedisStorage::new_with_config(
        conn.clone(),
        apalis_redis::Config::default().set_namespace(jobs::QUEUE_PROCESS_NOTIFICATION),
    );
    let apply_rule = RedisStorage::new_with_config(
        conn,
        apalis_redis::Config::default().set_namespace(jobs::QUEUE_APPLY_RULE),
    );

    Ok(JobQueues { sync_notifications, process_notification, apply_rule })
}

/// Mounted under `{api_path}`: the notification list/bulk endpoints plus a
/// health check, no auth layer (§1 excludes multi-tenant auth).
pub fn run_server(
    listener: TcpListener,
    settings: Settings,
    database: Database,
    redis_client: redis::Client,
    queues: Arc<JobQueues>,
) -> anyhow::Result<Server> {
    let api_path = settings.application.api_path.clone();
    let database_data = Data::new(database);
    let redis_data = Data::new(redis_client);
    let queues_data = Data::new(queues);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(database_data.clone())
            .app_data(redis_data.clone())
            .app_data(queues_data.clone())
            .service(
                web::scope(&api_path)
                    .service(web::resource("/ping").route(web::get().to(routes::ping)))
                    .service(routes::notification_scope()),
            )
    })
    .listen(listener)
    .context("Failed to bind the HTTP server to its listener")?
    .run();

    Ok(server)
}

/// Logs a handler failure once it's given up retrying, mirroring the
/// teacher's `WorkerOnFailure`.
struct WorkerOnFailure;

impl<E: std::fmt::Display> OnFailure<E> for WorkerOnFailure {
    fn on_failure(&mut self, _: &apalis::prelude::TaskId, _: std::time::Duration, result: &mut Result<Option<String>, E>) {
        if let Err(err) = result {
            tracing::error!("Job failed: {err}");
        }
    }
}

/// Registers the three workers driving the sync pipeline (§4.10, §5, §11):
/// `sync_notifications` at concurrency 1 (the structural substitute for a
/// dedicated unique-job layer, see `DESIGN.md`), and the two fan-out queues
/// at the concurrency the operator configured.
pub async fn run_worker(
    settings: &Settings,
    context: JobContext,
    queues: Arc<JobQueues>,
) -> anyhow::Result<Monitor> {
    let context_data = Data::new(context);
    let queues_data = Data::new(queues.clone());

    let sync_worker = WorkerBuilder::new("sync-notifications")
        .concurrency(1)
        .data(context_data.clone())
        .data(queues_data.clone())
        .on_failure(WorkerOnFailure)
        .backend(queues.sync_notifications.clone())
        .build_fn(jobs::sync::handle_sync_job);

    let process_worker = WorkerBuilder::new("process-notification")
        .concurrency(settings.sync.process_notification_workers)
        .data(context_data.clone())
        .data(queues_data.clone())
        .on_failure(WorkerOnFailure)
        .backend(queues.process_notification.clone())
        .build_fn(jobs::process::handle_process_notification);

    let apply_rule_worker = WorkerBuilder::new("apply-rule")
        .concurrency(settings.sync.apply_rule_workers)
        .data(context_data)
        .on_failure(WorkerOnFailure)
        .backend(queues.apply_rule.clone())
        .build_fn(jobs::apply_rule::handle_apply_rule);

    Ok(Monitor::new()
        .register(sync_worker)
        .register(process_worker)
        .register(apply_rule_worker))
}
