//! Robo API server binary

use std::net::SocketAddr;
use std::sync::Arc;

use robo_api::{build_router, telemetry, AppState, Collaborators, Config};
use robo_auth_core::BcryptHasher;
use robo_billing_core::StripeProvider;
use robo_db::PgStore;
use robo_fleet_core::{HttpReplyNotifier, NoopNotifier, OpenAiGenerator, ReplyNotifier};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("robo_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Robo API");

    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        message_quota = config.policy.message_quota,
        "Configuration loaded"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(telemetry::setup_metrics()?)
    } else {
        None
    };

    // Database
    let pool = robo_db::create_pool(&config.database_url).await?;
    robo_db::run_migrations(&pool).await?;
    tracing::info!("Database pool created and migrations applied");

    // Collaborators
    let mut generator = OpenAiGenerator::new(config.generator.api_key.clone());
    if let Some(model) = &config.generator.model {
        generator = generator.with_model(model.clone());
    }
    if let Some(base_url) = &config.generator.base_url {
        generator = generator.with_base_url(base_url.clone());
    }
    let notifier: Arc<dyn ReplyNotifier> = match &config.notify_url {
        Some(url) => Arc::new(HttpReplyNotifier::new(url.clone())),
        None => {
            tracing::info!("NOTIFY_URL not set, reply notifications disabled");
            Arc::new(NoopNotifier)
        }
    };
    let collaborators = Collaborators {
        hasher: Arc::new(BcryptHasher::new(config.auth.bcrypt_cost)),
        provider: Arc::new(StripeProvider::new(config.billing.clone())),
        generator: Arc::new(generator),
        notifier,
    };

    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        config.auth.clone(),
        config.billing.clone(),
        config.policy.clone(),
        collaborators,
        config.request_timeout,
    );
    let app = build_router(state, metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
