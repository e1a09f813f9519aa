use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;

use printshop_api::{
    app_router,
    config::{init_tracing, load_config},
    db,
    events::{process_events, EventContext, EventSender},
    handlers::AppServices,
    payments::StripeClient,
    services::notifications::LogMailer,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(config.log_level(), config.log_json);

    info!(environment = %config.environment, "Starting printshop API");

    let db = Arc::new(
        db::establish_connection(&config.database_url)
            .await
            .context("failed to connect to database")?,
    );

    if config.auto_migrate {
        db::run_migrations(&db)
            .await
            .context("schema bootstrap failed")?;
    }

    let (tx, rx) = mpsc::channel(100);
    let event_sender = EventSender::new(tx);

    let provider = Arc::new(StripeClient::new(
        config.payment_api_base.clone(),
        config.payment_api_key.clone(),
    ));

    let services = Arc::new(AppServices::new(
        db.clone(),
        provider.clone(),
        event_sender.clone(),
        &config,
    ));

    tokio::spawn(process_events(
        rx,
        EventContext {
            discounts: services.discounts.clone(),
            mailer: Arc::new(LogMailer),
            staff_email: config.staff_notification_email.clone(),
        },
    ));

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        db,
        config: Arc::new(config),
        event_sender,
        services,
        provider,
    };

    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install terminate handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
