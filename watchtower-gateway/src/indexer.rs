/**
 * CLIENT INDEXER - Requêtes basic auth vers l'index d'alertes
 *
 * RÔLE :
 * Ce module interroge l'indexer Wazuh (API _search) : agrégations de
 * sévérité sur rule.level et récupération des alertes récentes.
 *
 * FONCTIONNEMENT :
 * - POST {index}/_search avec corps JSON (size 0 pour les agrégations)
 * - Basic auth à chaque requête, pas de session
 * - Les agrégations utilisent wazuh-alerts-4.x-*, les documents wazuh-alerts*
 */

use reqwest::header;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::GatewayError;
use crate::models::{AlertView, SeverityScale};

const AGG_INDEX: &str = "wazuh-alerts-4.x-*";
const ALERTS_INDEX: &str = "wazuh-alerts*";

/// Fenêtre temporelle RFC3339 appliquée au champ timestamp des documents
#[derive(Debug, Clone)]
pub struct TimeWindow {
    pub gte: String,
    pub lte: String,
}

/// Bucket nommé d'une agrégation range
#[derive(Debug, Clone, Deserialize)]
pub struct BucketCount {
    pub key: String,
    #[serde(default)]
    pub doc_count: u64,
}

/// Compte d'un bucket par nom, 0 si le bucket est absent de la réponse
pub fn bucket_count(buckets: &[BucketCount], key: &str) -> u64 {
    buckets
        .iter()
        .find(|b| b.key == key)
        .map(|b| b.doc_count)
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct AggResponse {
    aggregations: Option<SeverityAgg>,
}

#[derive(Debug, Deserialize)]
struct SeverityAgg {
    severity: Option<RangeBuckets>,
}

#[derive(Debug, Deserialize)]
struct RangeBuckets {
    #[serde(default)]
    buckets: Vec<BucketCount>,
}

#[derive(Debug, Deserialize)]
struct HitsResponse {
    hits: Option<HitsOuter>,
}

#[derive(Debug, Deserialize)]
struct HitsOuter {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: AlertSource,
}

#[derive(Debug, Default, Deserialize)]
struct AlertSource {
    #[serde(default)]
    rule: RuleInfo,
    #[serde(rename = "@timestamp")]
    timestamp: Option<String>,
    #[serde(default)]
    predecoder: PredecoderInfo,
    #[serde(default)]
    agent: AgentInfo,
}

#[derive(Debug, Default, Deserialize)]
struct RuleInfo {
    level: Option<u32>,
    description: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PredecoderInfo {
    hostname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentInfo {
    name: Option<String>,
}

#[derive(Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl IndexerClient {
    pub fn new(http: reqwest::Client, base_url: String, username: String, password: String) -> Self {
        Self { http, base_url, username, password }
    }

    /// Réponse brute de l'agrégation de sévérité, pour le passthrough de debug
    pub async fn severity_aggregation_raw(
        &self,
        scale: SeverityScale,
        window: Option<&TimeWindow>,
    ) -> Result<Value, GatewayError> {
        self.search(AGG_INDEX, &severity_query(scale, window)).await
    }

    /// Buckets typés de l'agrégation de sévérité.
    /// Les buckets absents de la réponse sont simplement omis du vec.
    pub async fn severity_buckets(
        &self,
        scale: SeverityScale,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<BucketCount>, GatewayError> {
        let raw = self.severity_aggregation_raw(scale, window).await?;
        let parsed: AggResponse = serde_json::from_value(raw)?;
        Ok(parsed
            .aggregations
            .and_then(|a| a.severity)
            .map(|s| s.buckets)
            .unwrap_or_default())
    }

    /// Les `limit` alertes les plus récentes, triées par @timestamp décroissant
    pub async fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertView>, GatewayError> {
        let raw = self.search(ALERTS_INDEX, &recent_alerts_query(limit)).await?;
        let parsed: HitsResponse = serde_json::from_value(raw)?;
        let hits = parsed.hits.map(|h| h.hits).unwrap_or_default();
        Ok(hits.into_iter().map(|h| flatten_alert(h.source)).collect())
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Value, GatewayError> {
        let url = format!("{}/{}/_search", self.base_url, index);
        let res = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(GatewayError::Upstream(format!(
                "POST {index}/_search -> {}",
                res.status()
            )));
        }
        Ok(res.json().await?)
    }
}

fn severity_query(scale: SeverityScale, window: Option<&TimeWindow>) -> Value {
    let mut body = json!({
        "size": 0,
        "aggs": {
            "severity": {
                "range": {
                    "field": "rule.level",
                    "ranges": scale.query_ranges(),
                }
            }
        }
    });
    if let Some(w) = window {
        body["query"] = json!({
            "range": {
                "timestamp": { "gte": w.gte, "lte": w.lte }
            }
        });
    }
    body
}

fn recent_alerts_query(limit: usize) -> Value {
    json!({
        "size": limit,
        "sort": [
            { "@timestamp": { "order": "desc" } }
        ],
        "_source": [
            "rule.level",
            "rule.description",
            "rule.id",
            "rule.groups",
            "@timestamp",
            "predecoder.hostname",
            "agent.name",
            "agent.id",
            "full_log",
            "location"
        ]
    })
}

fn flatten_alert(source: AlertSource) -> AlertView {
    AlertView {
        severity: source.rule.level,
        alert_description: source.rule.description,
        time: source.timestamp,
        host_name: source.predecoder.hostname,
        agent_name: source.agent.name,
        rule_groups: source.rule.groups.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_query_without_window_has_no_filter() {
        let body = severity_query(SeverityScale::AllTime, None);
        assert_eq!(body["size"], 0);
        assert!(body.get("query").is_none());
        assert_eq!(body["aggs"]["severity"]["range"]["field"], "rule.level");
        let ranges = body["aggs"]["severity"]["range"]["ranges"].as_array().unwrap();
        assert_eq!(ranges.len(), 4);
    }

    #[test]
    fn severity_query_with_window_filters_timestamp() {
        let window = TimeWindow {
            gte: "2026-08-06T00:00:00Z".into(),
            lte: "2026-08-07T00:00:00Z".into(),
        };
        let body = severity_query(SeverityScale::Last24h, Some(&window));
        assert_eq!(body["query"]["range"]["timestamp"]["gte"], "2026-08-06T00:00:00Z");
        assert_eq!(body["query"]["range"]["timestamp"]["lte"], "2026-08-07T00:00:00Z");
    }

    #[test]
    fn recent_query_sorts_descending_and_limits() {
        let body = recent_alerts_query(5);
        assert_eq!(body["size"], 5);
        assert_eq!(body["sort"][0]["@timestamp"]["order"], "desc");
        let fields = body["_source"].as_array().unwrap();
        assert!(fields.iter().any(|f| f == "predecoder.hostname"));
    }

    #[test]
    fn flatten_joins_rule_groups() {
        let source: AlertSource = serde_json::from_value(json!({
            "rule": { "level": 12, "description": "auth brute force", "groups": ["sshd", "authentication_failed"] },
            "@timestamp": "2026-08-07T10:00:00Z",
            "predecoder": { "hostname": "web-01" },
            "agent": { "name": "agent-web" }
        }))
        .unwrap();

        let view = flatten_alert(source);
        assert_eq!(view.severity, Some(12));
        assert_eq!(view.rule_groups, "sshd, authentication_failed");
        assert_eq!(view.host_name.as_deref(), Some("web-01"));
    }

    #[test]
    fn flatten_tolerates_sparse_documents() {
        let source: AlertSource = serde_json::from_value(json!({})).unwrap();
        let view = flatten_alert(source);
        assert_eq!(view.severity, None);
        assert_eq!(view.rule_groups, "");
    }

    #[test]
    fn missing_bucket_counts_as_zero() {
        let buckets = vec![
            BucketCount { key: "Info".into(), doc_count: 4 },
            BucketCount { key: "Minor".into(), doc_count: 2 },
        ];
        assert_eq!(bucket_count(&buckets, "Info"), 4);
        assert_eq!(bucket_count(&buckets, "Critical"), 0);
    }
}
