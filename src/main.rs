mod config;
mod errors;
mod handlers;
mod models;
mod services;
mod worker;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{
    config::Config,
    handlers::BotContext,
    services::{BackupService, LookupService, TelegramService, UserRegistry},
};
use tracing;
use tracing_subscriber;

#[tokio::main]
async fn main() {
    // Initialize basic tracing subscriber
    tracing_subscriber::fmt::init();

    // Load configuration; malformed configuration is fatal at startup.
    let config = Config::load().expect("Failed to load configuration");

    // Restore the authorized-user set and usage counters from the backup.
    let backup = BackupService::new(&config.backup.path);
    let registry = Arc::new(
        UserRegistry::load(backup, config.telegram.admin_id, config.quota.daily_limit)
            .expect("Failed to load backup snapshot"),
    );

    let ctx = Arc::new(BotContext {
        registry: registry.clone(),
        telegram: TelegramService::new(&config.telegram),
        lookup: LookupService::new(&config.lookup),
        admin_contact: config.telegram.admin_contact.clone(),
    });

    // Command dispatcher loop and the daily quota reset run as background
    // tasks; both mutate state only through the shared registry.
    tokio::spawn(handlers::run_dispatcher(ctx));
    tokio::spawn(worker::reset_scheduler(registry, config.quota.reset_timezone));

    // Liveness endpoint for external health checks.
    let app = Router::new().route("/", get(|| async { "Lookup bot is running." }));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Liveness endpoint on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind server");

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Failed to start server");
}
