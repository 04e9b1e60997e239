use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use todo_service::config::ServerConfig;
use todo_service::logging::init_tracing;
use todo_service::request_id::RequestIdGenerator;
use todo_service::store::{LibSqlTodoStore, TodoStore};
use todo_service::todos::{TodoState, todo_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    init_tracing(config.log_level, config.log_format);

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn TodoStore> = Arc::new(
        LibSqlTodoStore::new_local(&config.db_file)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_file.display()))?,
    );

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = todo_routes(TodoState::new(store), RequestIdGenerator::canonical())
        .layer(TimeoutLayer::new(config.request_timeout));

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    info!(port = config.port, "starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
