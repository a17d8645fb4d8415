/**
 * CLIENT MANAGER WAZUH - Requêtes authentifiées vers l'API de gestion
 *
 * RÔLE :
 * Ce module parle à l'API REST du manager Wazuh : authentification basic,
 * puis requêtes bearer pour agents, scores SCA, résumé de statut et santé.
 *
 * FONCTIONNEMENT :
 * - POST /security/user/authenticate en basic auth -> token de session (900s)
 * - Toutes les autres routes en bearer avec le token fourni par l'appelant
 * - Réponses enveloppées {data: {affected_items: [...]}, error: 0}
 *
 * UTILITÉ DANS WATCHTOWER :
 * 🎯 Source des identifiants d'agents actifs et de leurs scores de conformité
 * 🎯 Santé du manager (validation de configuration) pour le dashboard
 * 🎯 Passthrough /manager/stats pour le debug
 */

use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::GatewayError;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    data: Option<AuthData>,
    error: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AffectedItems<T> {
    #[serde(default = "Vec::new")]
    affected_items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AgentRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ScaPolicy {
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ValidationItem {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    connection: Option<ConnectionCounts>,
}

/// Compteurs de connexion renvoyés par /agents/summary/status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionCounts {
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub disconnected: u64,
    #[serde(default)]
    pub never_connected: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Clone)]
pub struct WazuhClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl WazuhClient {
    pub fn new(http: reqwest::Client, base_url: String, username: String, password: String) -> Self {
        Self { http, base_url, username, password }
    }

    /// Authentification basic -> token de session.
    /// Succès seulement si error == 0 et token non vide, sinon échec d'auth.
    pub async fn authenticate(&self) -> Result<String, GatewayError> {
        let url = format!("{}/security/user/authenticate", self.base_url);
        let res = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|_| GatewayError::Auth)?;

        let body: AuthResponse = res.json().await.map_err(|_| GatewayError::Auth)?;
        match (body.error, body.data.and_then(|d| d.token)) {
            (Some(0), Some(token)) if !token.is_empty() => Ok(token),
            _ => Err(GatewayError::Auth),
        }
    }

    /// Identifiants des agents en statut actif, vide si aucun
    pub async fn active_agent_ids(&self, token: &str) -> Result<Vec<String>, GatewayError> {
        let body: Envelope<AffectedItems<AgentRef>> =
            self.get_json(token, "/agents?status=active").await?;
        Ok(body
            .data
            .map(|d| d.affected_items.into_iter().map(|a| a.id).collect())
            .unwrap_or_default())
    }

    /// Score SCA d'un agent : première policy rapportée.
    /// L'absence de score est un état valide, pas une erreur : un appel
    /// par agent qui échoue ou ne rapporte rien donne None.
    pub async fn agent_score(&self, token: &str, agent_id: &str) -> Option<f64> {
        let body: Envelope<AffectedItems<ScaPolicy>> =
            self.get_json(token, &format!("/sca/{agent_id}")).await.ok()?;
        body.data?.affected_items.first()?.score
    }

    /// Compteurs de connexion agrégés par statut
    pub async fn agent_status_summary(&self, token: &str) -> Result<ConnectionCounts, GatewayError> {
        let body: Envelope<SummaryData> = self.get_json(token, "/agents/summary/status").await?;
        Ok(body.data.and_then(|d| d.connection).unwrap_or_default())
    }

    /// Statut de validation de la configuration du manager
    pub async fn manager_health(&self, token: &str) -> Result<Option<String>, GatewayError> {
        let body: Envelope<AffectedItems<ValidationItem>> =
            self.get_json(token, "/manager/configuration/validation").await?;
        Ok(body
            .data
            .and_then(|d| d.affected_items.into_iter().next())
            .and_then(|item| item.status))
    }

    /// Passthrough brut de /manager/stats
    pub async fn manager_stats(&self, token: &str) -> Result<Value, GatewayError> {
        self.get_json(token, "/manager/stats").await
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(GatewayError::Upstream(format!("GET {path} -> {}", res.status())));
        }
        Ok(res.json().await?)
    }
}
