/*!
Stubs upstream pour développement et tests sans infrastructure Wazuh

Simule le manager Wazuh (authentification, agents, SCA, santé) et
l'indexer d'alertes (_search). Chaque stub écoute sur un port éphémère,
rejoue un profil configurable et compte les requêtes reçues.
*/

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Comportement du manager Wazuh simulé
#[derive(Debug, Clone)]
pub struct WazuhProfile {
    /// Token renvoyé par l'endpoint d'authentification
    pub token: String,
    /// Rejette l'authentification avec error != 0
    pub reject_auth: bool,
    /// Agents actifs connus, avec leur score SCA éventuel
    pub agents: Vec<StubAgent>,
    /// Statut de validation de configuration, None = aucun item
    pub manager_status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StubAgent {
    pub id: String,
    pub score: Option<f64>,
}

impl Default for WazuhProfile {
    fn default() -> Self {
        Self {
            token: "stub-session-token".to_string(),
            reject_auth: false,
            agents: Vec::new(),
            manager_status: Some("OK".to_string()),
        }
    }
}

/// Comportement de l'indexer simulé
#[derive(Debug, Clone, Default)]
pub struct IndexerProfile {
    /// Comptes par clé de bucket; les clés absentes sont omises de la réponse
    pub bucket_counts: HashMap<String, u64>,
    /// Valeur de hits.total, indépendante des buckets
    pub hits_total: u64,
    /// Documents _source renvoyés aux requêtes triées, plus récent d'abord
    pub recent_alerts: Vec<Value>,
}

struct WazuhState {
    profile: WazuhProfile,
    auth_requests: Arc<AtomicU32>,
}

/// Manager Wazuh simulé sur un port éphémère
pub struct StubWazuh {
    pub base_url: String,
    auth_requests: Arc<AtomicU32>,
}

impl StubWazuh {
    pub async fn spawn(profile: WazuhProfile) -> anyhow::Result<Self> {
        let auth_requests = Arc::new(AtomicU32::new(0));
        let state = Arc::new(WazuhState { profile, auth_requests: auth_requests.clone() });

        let app = Router::new()
            .route("/security/user/authenticate", post(authenticate))
            .route("/agents", get(list_agents))
            .route("/agents/summary/status", get(agent_summary))
            .route("/sca/{agent_id}", get(sca_policies))
            .route("/manager/configuration/validation", get(manager_validation))
            .route("/manager/stats", get(manager_stats))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        log::info!("[stub] manager Wazuh simulé sur {base_url}");
        Ok(Self { base_url, auth_requests })
    }

    /// Nombre d'authentifications reçues depuis le spawn
    pub fn auth_requests(&self) -> u32 {
        self.auth_requests.load(Ordering::Relaxed)
    }
}

async fn authenticate(State(st): State<Arc<WazuhState>>) -> Json<Value> {
    st.auth_requests.fetch_add(1, Ordering::Relaxed);
    if st.profile.reject_auth {
        Json(json!({ "data": {}, "error": 1 }))
    } else {
        Json(json!({ "data": { "token": st.profile.token }, "error": 0 }))
    }
}

async fn list_agents(State(st): State<Arc<WazuhState>>) -> Json<Value> {
    let items: Vec<Value> = st
        .profile
        .agents
        .iter()
        .map(|a| json!({ "id": a.id, "status": "active" }))
        .collect();
    Json(affected_items(items))
}

async fn agent_summary(State(st): State<Arc<WazuhState>>) -> Json<Value> {
    let active = st.profile.agents.len();
    Json(json!({
        "data": {
            "connection": {
                "active": active,
                "disconnected": 0,
                "never_connected": 0,
                "pending": 0,
                "total": active
            }
        },
        "error": 0
    }))
}

async fn sca_policies(
    State(st): State<Arc<WazuhState>>,
    Path(agent_id): Path<String>,
) -> Json<Value> {
    let items: Vec<Value> = st
        .profile
        .agents
        .iter()
        .filter(|a| a.id == agent_id)
        .filter_map(|a| a.score.map(|score| json!({ "policy_id": "cis_stub", "score": score })))
        .collect();
    Json(affected_items(items))
}

async fn manager_validation(State(st): State<Arc<WazuhState>>) -> Json<Value> {
    let items: Vec<Value> = st
        .profile
        .manager_status
        .iter()
        .map(|status| json!({ "name": "manager", "status": status }))
        .collect();
    Json(affected_items(items))
}

async fn manager_stats(State(_st): State<Arc<WazuhState>>) -> Json<Value> {
    Json(affected_items(vec![json!({ "hour": 9, "totalAlerts": 0, "events": 0 })]))
}

struct IndexerState {
    profile: IndexerProfile,
    search_requests: Arc<AtomicU32>,
}

/// Indexer d'alertes simulé sur un port éphémère
pub struct StubIndexer {
    pub base_url: String,
    search_requests: Arc<AtomicU32>,
}

impl StubIndexer {
    pub async fn spawn(profile: IndexerProfile) -> anyhow::Result<Self> {
        let search_requests = Arc::new(AtomicU32::new(0));
        let state = Arc::new(IndexerState { profile, search_requests: search_requests.clone() });

        let app = Router::new()
            .route("/{index}/_search", post(search))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        log::info!("[stub] indexer simulé sur {base_url}");
        Ok(Self { base_url, search_requests })
    }

    /// Nombre de requêtes _search reçues depuis le spawn
    pub fn search_requests(&self) -> u32 {
        self.search_requests.load(Ordering::Relaxed)
    }
}

async fn search(
    State(st): State<Arc<IndexerState>>,
    Path(_index): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    st.search_requests.fetch_add(1, Ordering::Relaxed);
    if body.get("aggs").is_some() {
        Json(aggregation_response(&st.profile, &body))
    } else {
        Json(hits_response(&st.profile, &body))
    }
}

/// Réponse d'agrégation : un bucket par clé demandée ET connue du profil
fn aggregation_response(profile: &IndexerProfile, body: &Value) -> Value {
    let requested = body
        .pointer("/aggs/severity/range/ranges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let buckets: Vec<Value> = requested
        .iter()
        .filter_map(|r| r.get("key").and_then(Value::as_str))
        .filter_map(|key| {
            profile
                .bucket_counts
                .get(key)
                .map(|count| json!({ "key": key, "doc_count": count }))
        })
        .collect();

    json!({
        "took": 3,
        "timed_out": false,
        "hits": { "total": { "value": profile.hits_total, "relation": "eq" }, "hits": [] },
        "aggregations": { "severity": { "buckets": buckets } }
    })
}

/// Réponse documents : rejoue recent_alerts dans l'ordre, bornée par size
fn hits_response(profile: &IndexerProfile, body: &Value) -> Value {
    let size = body.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;
    let hits: Vec<Value> = profile
        .recent_alerts
        .iter()
        .take(size)
        .enumerate()
        .map(|(i, source)| {
            json!({
                "_index": "wazuh-alerts-4.x-stub",
                "_id": format!("doc-{i}"),
                "_source": source
            })
        })
        .collect();

    json!({
        "took": 2,
        "timed_out": false,
        "hits": { "total": { "value": hits.len(), "relation": "eq" }, "hits": hits }
    })
}

/// Enveloppe standard {data: {affected_items}, error: 0} du manager
pub fn affected_items(items: Vec<Value>) -> Value {
    json!({
        "data": {
            "affected_items": items,
            "total_affected_items": items.len(),
            "total_failed_items": 0,
            "failed_items": []
        },
        "message": "",
        "error": 0
    })
}

/// Document d'alerte minimal tel que stocké dans l'index
pub fn alert_doc(
    level: u32,
    description: &str,
    timestamp: &str,
    hostname: &str,
    agent_name: &str,
    groups: &[&str],
) -> Value {
    json!({
        "rule": {
            "level": level,
            "description": description,
            "id": "100001",
            "groups": groups
        },
        "@timestamp": timestamp,
        "predecoder": { "hostname": hostname },
        "agent": { "name": agent_name, "id": "001" },
        "full_log": format!("stub: {description}"),
        "location": "/var/log/stub.log"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affected_items_wraps_with_error_zero() {
        let body = affected_items(vec![json!({ "id": "001" })]);
        assert_eq!(body["error"], 0);
        assert_eq!(body["data"]["total_affected_items"], 1);
        assert_eq!(body["data"]["affected_items"][0]["id"], "001");
    }

    #[test]
    fn aggregation_echoes_only_known_requested_keys() {
        let profile = IndexerProfile {
            bucket_counts: [("Info".to_string(), 7), ("Critical".to_string(), 2)]
                .into_iter()
                .collect(),
            hits_total: 50,
            ..IndexerProfile::default()
        };
        let body = json!({
            "size": 0,
            "aggs": { "severity": { "range": { "field": "rule.level", "ranges": [
                { "key": "Info", "to": 6 },
                { "key": "Minor", "from": 7, "to": 11 },
                { "key": "Critical", "from": 13 }
            ] } } }
        });

        let resp = aggregation_response(&profile, &body);
        let buckets = resp["aggregations"]["severity"]["buckets"].as_array().unwrap();
        assert_eq!(buckets.len(), 2); // Minor inconnu du profil -> omis
        assert_eq!(resp["hits"]["total"]["value"], 50);
    }

    #[test]
    fn hits_are_bounded_by_requested_size() {
        let profile = IndexerProfile {
            recent_alerts: (0..8)
                .map(|i| alert_doc(5, "doc", &format!("2026-08-07T10:0{i}:00Z"), "h", "a", &["g"]))
                .collect(),
            ..IndexerProfile::default()
        };
        let resp = hits_response(&profile, &json!({ "size": 5, "sort": [] }));
        assert_eq!(resp["hits"]["hits"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn alert_doc_carries_the_projected_fields() {
        let doc = alert_doc(12, "brute force", "2026-08-07T10:00:00Z", "web-01", "agent-web", &["sshd"]);
        assert_eq!(doc["rule"]["level"], 12);
        assert_eq!(doc["@timestamp"], "2026-08-07T10:00:00Z");
        assert_eq!(doc["predecoder"]["hostname"], "web-01");
        assert_eq!(doc["agent"]["name"], "agent-web");
    }
}
