use anyhow::{Context, Result};
use gander_core::config::{AppConfig, LoadOptions};
use gander_core::logging;
use gander_webhook::{router, WebhookState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    logging::init(&config);

    let state = WebhookState {
        integration_url: config.webhook.integration_url.clone(),
        slash_secret: config.webhook.slash_secret.clone(),
    };

    let address = format!("{}:{}", config.webhook.bind_address, config.webhook.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind webhook listener on {address}"))?;

    info!(
        event_name = "system.webhook.started",
        bind_address = %address,
        integration_url = %config.webhook.integration_url,
        slash_secret_configured = config.webhook.slash_secret.is_some(),
        "webhook service listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("webhook server terminated unexpectedly")?;

    info!(event_name = "system.webhook.stopped", "webhook service stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(_) => {
                ctrl_c.await.ok();
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
