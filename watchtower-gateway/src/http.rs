/**
 * API REST WATCHTOWER - Surface HTTP de la passerelle
 *
 * RÔLE :
 * Ce module expose les endpoints JSON consommés par le dashboard navigateur.
 * Les handlers restent minces : ils délèguent à l'agrégateur et sérialisent.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, routes /dashboard-metrics, /severity-summary, /manager-stats
 * - /health et /system/health pour la supervision de la passerelle elle-même
 * - CORS permissif : l'appelant est un navigateur sur une autre origine
 * - Toute erreur -> 500 {"error": message}, jamais de réponse partielle
 */

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::GatewayError;
use crate::health::{GatewayHealth, HealthTracker};
use crate::indexer::IndexerClient;
use crate::metrics;
use crate::models::DashboardMetrics;
use crate::token::TokenCache;
use crate::wazuh::WazuhClient;

#[derive(Clone)]
pub struct AppState {
    pub wazuh: WazuhClient,
    pub indexer: IndexerClient,
    pub token_cache: TokenCache,
    pub health: HealthTracker,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/dashboard-metrics", get(get_dashboard_metrics))
        .route("/severity-summary", get(get_severity_summary))
        .route("/manager-stats", get(get_manager_stats))
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// GET /system/health (état interne de la passerelle)
async fn get_system_health(State(app): State<AppState>) -> Json<GatewayHealth> {
    Json(app.health.snapshot())
}

// GET /dashboard-metrics (snapshot agrégé complet)
async fn get_dashboard_metrics(
    State(app): State<AppState>,
) -> Result<Json<DashboardMetrics>, GatewayError> {
    app.health.mark_request();
    match metrics::build_dashboard_metrics(&app).await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => Err(report_failure(&app.health, "dashboard-metrics", e)),
    }
}

// GET /severity-summary (agrégation brute, debug)
async fn get_severity_summary(State(app): State<AppState>) -> Result<Json<Value>, GatewayError> {
    app.health.mark_request();
    match metrics::severity_summary(&app).await {
        Ok(raw) => Ok(Json(raw)),
        Err(e) => Err(report_failure(&app.health, "severity-summary", e)),
    }
}

// GET /manager-stats (passthrough des stats du manager)
async fn get_manager_stats(State(app): State<AppState>) -> Result<Json<Value>, GatewayError> {
    app.health.mark_request();
    let result = async {
        let token = app.token_cache.get_valid_token(&app.wazuh).await?;
        app.wazuh.manager_stats(&token).await
    }
    .await;

    match result {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => Err(report_failure(&app.health, "manager-stats", e)),
    }
}

fn report_failure(health: &HealthTracker, route: &str, e: GatewayError) -> GatewayError {
    tracing::error!("{route}: {e}");
    health.mark_failure(&e);
    e
}
