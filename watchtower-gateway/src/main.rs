/**
 * WATCHTOWER GATEWAY - Point d'entrée principal de la passerelle
 *
 * RÔLE : Orchestration de tous les modules : config, clients upstream,
 * cache de token, agrégateur, HTTP. Bootstrap du service complet.
 *
 * ARCHITECTURE : API REST d'agrégation -> manager Wazuh + indexer d'alertes.
 * UTILITÉ : Source unique des métriques SOC pour le dashboard navigateur.
 */

mod config;
mod errors;
mod health;
mod http;
mod indexer;
mod metrics;
mod models;
mod token;
mod wazuh;

use crate::config::GatewayConfig;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::indexer::IndexerClient;
use crate::token::TokenCache;
use crate::wazuh::WazuhClient;

use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "watchtower_gateway=info,tower_http=warn".to_string()),
        )
        .init();

    let cfg = GatewayConfig::from_env().context("configuration invalide")?;

    if cfg.insecure_tls {
        warn!("vérification TLS upstream désactivée (certificats auto-signés attendus)");
    }

    // Client HTTP partagé par les deux upstreams
    let http_client = reqwest::Client::builder()
        .danger_accept_invalid_certs(cfg.insecure_tls)
        .connect_timeout(Duration::from_secs(cfg.http_timeout_secs))
        .timeout(Duration::from_secs(cfg.http_timeout_secs))
        .build()
        .context("construction du client HTTP upstream")?;

    let health_tracker = HealthTracker::new();
    let wazuh = WazuhClient::new(
        http_client.clone(),
        cfg.wazuh_host.clone(),
        cfg.wazuh_user.clone(),
        cfg.wazuh_pass.clone(),
    );
    let indexer = IndexerClient::new(
        http_client,
        cfg.indexer_host.clone(),
        cfg.indexer_user.clone(),
        cfg.indexer_pass.clone(),
    );
    let token_cache = TokenCache::new(health_tracker.clone());

    // fabrique l'état unique pour Axum
    let app_state = AppState {
        wazuh,
        indexer,
        token_cache,
        health: health_tracker,
    };

    let app = http::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("passerelle en écoute sur http://{addr}");
    let listener = TcpListener::bind(addr).await.context("bind du port d'écoute")?;
    axum::serve(listener, app).await.context("serveur HTTP")?;
    Ok(())
}
