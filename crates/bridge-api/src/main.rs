//! Signal bridge service.
//!
//! Wires the gateway client, store, link manager, delivery pipeline and
//! inbound listener together, and serves the HTTP surface the app UI and the
//! chat service talk to.

mod chat;
mod config;
mod error;
mod routes;
mod state;

use std::time::Duration;

use tracing::{info, warn};

use bridge::{DeliveryConfig, DeliveryPipeline, InboundListener, LinkConfig, LinkManager, ListenerConfig};
use bridge_store::{Database, PhoneCipher};
use signal_gateway::{GatewayClient, GatewayConfig, ReconnectConfig};

use crate::chat::HttpChatPipeline;
use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting Signal bridge");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let cipher = PhoneCipher::from_key_str(&config.phone_cipher_key)?;

    // Connect to the gateway
    let gateway_config = match &config.gateway_account {
        Some(account) => GatewayConfig::with_account(&config.gateway_url, account),
        None => GatewayConfig::new(&config.gateway_url),
    };
    let gateway = GatewayClient::connect(gateway_config).await?;
    let _health_monitor = gateway.start_health_monitor(Duration::from_secs(60));

    // Dismissed banners are short-lived; sweep them out daily.
    let prune_db = db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        interval.tick().await;
        loop {
            interval.tick().await;
            match bridge_store::banner::prune_dismissed(prune_db.pool(), 30).await {
                Ok(0) => {}
                Ok(pruned) => info!(pruned, "Pruned dismissed banners"),
                Err(e) => warn!("Banner prune failed: {}", e),
            }
        }
    });

    let own_number = match gateway.get_self_number().await {
        Ok(number) => Some(number),
        Err(e) => {
            warn!("Could not read gateway account number: {}", e);
            None
        }
    };

    // Inbound listener: one logical stream for the process lifetime,
    // reconnecting with a short delay, torn down on ctrl-c.
    let stream = signal_gateway::subscribe_with_reconnect(
        &gateway,
        ReconnectConfig {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        },
    );
    let chat_pipeline = HttpChatPipeline::new(reqwest::Client::new(), &config.chat_api_url);
    let listener = InboundListener::new(
        gateway.clone(),
        chat_pipeline,
        db.clone(),
        ListenerConfig {
            own_number,
            ..Default::default()
        },
    );
    let listener_task = tokio::spawn(async move {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        };
        listener.run_with_shutdown(stream, shutdown).await;
    });

    // Build application state
    let link = LinkManager::new(gateway.clone(), db.clone(), cipher.clone(), LinkConfig::default());
    let delivery = DeliveryPipeline::new(
        gateway.clone(),
        db.clone(),
        cipher,
        DeliveryConfig {
            app_base_url: config.app_base_url.clone(),
            ..Default::default()
        },
    );
    let state = AppState::new(db, link, delivery, gateway);

    // Build router
    let app = routes::router().with_state(state);

    // Start server
    info!(addr = %config.addr, "Signal bridge listening");
    let listener_socket = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener_socket, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    // The listener shares the same shutdown signal; wait for it to finish.
    if let Err(e) = listener_task.await {
        warn!("Listener task ended abnormally: {}", e);
    }

    info!("Signal bridge stopped");
    Ok(())
}
