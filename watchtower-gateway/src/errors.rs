use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Erreurs de la passerelle, toutes rendues en HTTP 500 avec {"error": ...}.
/// Pas de mode dégradé : la première erreur annule la réponse entière.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Wazuh authentication failed")]
    Auth,
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("aggregation failed: {0}")]
    Aggregation(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Upstream(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Upstream(format!("invalid upstream JSON: {e}"))
    }
}

impl From<time::error::Format> for GatewayError {
    fn from(e: time::error::Format) -> Self {
        GatewayError::Aggregation(format!("timestamp formatting: {e}"))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_keeps_upstream_wording() {
        assert_eq!(GatewayError::Auth.to_string(), "Wazuh authentication failed");
    }

    #[test]
    fn every_variant_maps_to_500() {
        for err in [
            GatewayError::Auth,
            GatewayError::Upstream("GET /agents -> 503".into()),
            GatewayError::Aggregation("compliance score: boom".into()),
        ] {
            let resp = err.into_response();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
