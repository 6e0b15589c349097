use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gander_core::config::{AppConfig, LoadOptions};
use gander_core::logging;
use gander_mattermost::{MattermostClient, PersonaBot, RealtimeRunner, WebSocketTransport};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    logging::init(&config);

    config.mattermost.require_bot_token()?;

    let client = MattermostClient::new(&config.mattermost)?;

    // Identity must be known before any event is dispatched; without it the
    // bot cannot suppress its own posts. Any failure here aborts startup.
    let me = client
        .get_me()
        .await
        .context("identity lookup failed, refusing to start the dispatch loop")?;

    info!(
        event_name = "system.bot.identified",
        username = %me.username,
        user_id = %me.id,
        "bot identity established"
    );

    let handler = PersonaBot::new(
        client,
        me.id,
        &config.bot.trigger_keyword,
        config.webhook.integration_url.clone(),
    );
    let transport =
        WebSocketTransport::new(&config.mattermost.base_url, config.mattermost.bot_token.clone());
    let runner = RealtimeRunner::new(
        Arc::new(transport),
        Arc::new(handler),
        Duration::from_secs(config.bot.reconnect_delay_secs),
    );

    info!(
        event_name = "system.bot.started",
        base_url = %config.mattermost.base_url,
        trigger_keyword = %config.bot.trigger_keyword,
        "starting realtime event loop"
    );

    // The runner never returns on its own; only a signal ends the process.
    tokio::select! {
        () = runner.run() => {}
        () = wait_for_shutdown() => {
            info!(event_name = "system.bot.stopping", "shutdown signal received");
        }
    }

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
