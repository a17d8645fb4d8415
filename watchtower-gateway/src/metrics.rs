/**
 * AGRÉGATEUR - Construction des payloads dashboard multi-sources
 *
 * RÔLE :
 * Ce module orchestre les appels manager + indexer et fusionne leurs
 * réponses hétérogènes en un snapshot stable pour le dashboard.
 *
 * FONCTIONNEMENT :
 * - Appels upstream séquentiels dans la requête, le token est le seul prérequis
 * - total_alerts = somme des buckets de sévérité, jamais hits.total
 * - La première erreur annule le snapshot entier, pas de résultat partiel
 */

use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::errors::GatewayError;
use crate::http::AppState;
use crate::indexer::{bucket_count, TimeWindow};
use crate::models::{DashboardMetrics, SeverityScale};

/// Nombre d'alertes récentes projetées dans le snapshot
pub const RECENT_ALERTS_LIMIT: usize = 5;

/// Moyenne arithmétique des scores SCA des agents actifs, arrondie à 2
/// décimales. Zéro agent ou zéro score rapporté donne 0, un état valide.
pub async fn average_compliance_score(app: &AppState) -> Result<f64, GatewayError> {
    let token = app.token_cache.get_valid_token(&app.wazuh).await?;
    let agent_ids = app.wazuh.active_agent_ids(&token).await?;

    let mut scores = Vec::new();
    for agent_id in &agent_ids {
        if let Some(score) = app.wazuh.agent_score(&token, agent_id).await {
            scores.push(score);
        }
    }

    if scores.is_empty() {
        return Ok(0.0);
    }
    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
    Ok((avg * 100.0).round() / 100.0)
}

/// Snapshot complet du dashboard, construit à la demande
pub async fn build_dashboard_metrics(app: &AppState) -> Result<DashboardMetrics, GatewayError> {
    let token = app
        .token_cache
        .get_valid_token(&app.wazuh)
        .await
        .map_err(step("session token"))?;

    // 1. Total d'alertes global : somme des buckets, sans filtre temporel
    let all_time = app
        .indexer
        .severity_buckets(SeverityScale::AllTime, None)
        .await
        .map_err(step("total alerts"))?;
    let total_alerts: u64 = all_time.iter().map(|b| b.doc_count).sum();

    // 2. Score de conformité moyen
    let compliance = average_compliance_score(app).await.map_err(step("compliance score"))?;

    // 3. Santé du manager
    let wazuh_health = app
        .wazuh
        .manager_health(&token)
        .await
        .map_err(step("manager health"))?;

    // 4. Alertes récentes, les plus fraîches d'abord
    let alerts = app
        .indexer
        .recent_alerts(RECENT_ALERTS_LIMIT)
        .await
        .map_err(step("recent alerts"))?;

    // 5. Fenêtre 24h : buckets absents comptés à zéro
    let now = OffsetDateTime::now_utc();
    let window = TimeWindow {
        gte: (now - Duration::hours(24)).format(&Rfc3339).map_err(GatewayError::from)?,
        lte: now.format(&Rfc3339).map_err(GatewayError::from)?,
    };
    let last_24h = app
        .indexer
        .severity_buckets(SeverityScale::Last24h, Some(&window))
        .await
        .map_err(step("24h alerts"))?;
    let alerts_last_24hr: u64 = last_24h.iter().map(|b| b.doc_count).sum();

    // 6. Compteur d'agents actifs
    let summary = app
        .wazuh
        .agent_status_summary(&token)
        .await
        .map_err(step("agent summary"))?;

    Ok(DashboardMetrics {
        total_alerts,
        alerts_last_24hr,
        critical_alerts: bucket_count(&last_24h, "Critical"),
        high_alerts: bucket_count(&last_24h, "Major"),
        medium_alerts: bucket_count(&last_24h, "Minor"),
        low_alerts: bucket_count(&last_24h, "Info"),
        open_tickets: 0,
        resolved_today: 0,
        avg_response_time: "0s".to_string(),
        compliance_score: format_percentage(compliance),
        active_agents: summary.active,
        wazuh_health,
        alerts,
    })
}

/// Agrégation de sévérité brute (échelle de diagnostic), sans reformatage
pub async fn severity_summary(app: &AppState) -> Result<serde_json::Value, GatewayError> {
    app.indexer
        .severity_aggregation_raw(SeverityScale::Diagnostic, None)
        .await
}

/// Rendu "<float>%" : une moyenne entière garde une décimale ("90.0%")
pub fn format_percentage(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.1}%")
    } else {
        format!("{score}%")
    }
}

fn step(label: &'static str) -> impl Fn(GatewayError) -> GatewayError {
    move |e| GatewayError::Aggregation(format!("{label}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthTracker;
    use crate::indexer::IndexerClient;
    use crate::token::TokenCache;
    use crate::wazuh::WazuhClient;
    use watchtower_devkit::{alert_doc, IndexerProfile, StubAgent, StubIndexer, StubWazuh, WazuhProfile};

    async fn state_for(
        wazuh_profile: WazuhProfile,
        indexer_profile: IndexerProfile,
    ) -> (AppState, StubWazuh, StubIndexer) {
        let stub_wazuh = StubWazuh::spawn(wazuh_profile).await.unwrap();
        let stub_indexer = StubIndexer::spawn(indexer_profile).await.unwrap();

        let http = reqwest::Client::new();
        let health = HealthTracker::new();
        let app = AppState {
            wazuh: WazuhClient::new(
                http.clone(),
                stub_wazuh.base_url.clone(),
                "admin".into(),
                "secret".into(),
            ),
            indexer: IndexerClient::new(
                http,
                stub_indexer.base_url.clone(),
                "admin".into(),
                "secret".into(),
            ),
            token_cache: TokenCache::new(health.clone()),
            health,
        };
        (app, stub_wazuh, stub_indexer)
    }

    fn agents(scores: &[(&str, Option<f64>)]) -> Vec<StubAgent> {
        scores
            .iter()
            .map(|(id, score)| StubAgent { id: id.to_string(), score: *score })
            .collect()
    }

    #[tokio::test]
    async fn compliance_is_the_mean_of_reported_scores() {
        let profile = WazuhProfile {
            agents: agents(&[("001", Some(80.0)), ("002", Some(90.0)), ("003", Some(100.0))]),
            ..WazuhProfile::default()
        };
        let (app, _wazuh, _indexer) = state_for(profile, IndexerProfile::default()).await;

        let score = average_compliance_score(&app).await.unwrap();
        assert_eq!(score, 90.0);
        assert_eq!(format_percentage(score), "90.0%");
    }

    #[tokio::test]
    async fn agents_without_score_are_skipped() {
        let profile = WazuhProfile {
            agents: agents(&[("001", Some(80.0)), ("002", None), ("003", Some(90.0))]),
            ..WazuhProfile::default()
        };
        let (app, _wazuh, _indexer) = state_for(profile, IndexerProfile::default()).await;

        assert_eq!(average_compliance_score(&app).await.unwrap(), 85.0);
    }

    #[tokio::test]
    async fn no_agents_means_score_zero_not_error() {
        let (app, _wazuh, _indexer) =
            state_for(WazuhProfile::default(), IndexerProfile::default()).await;
        assert_eq!(average_compliance_score(&app).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn total_alerts_is_the_bucket_sum_not_hits_total() {
        let indexer_profile = IndexerProfile {
            bucket_counts: [
                ("Info".to_string(), 10),
                ("Minor".to_string(), 5),
                ("Major".to_string(), 3),
                ("Critical".to_string(), 2),
            ]
            .into_iter()
            .collect(),
            hits_total: 999, // volontairement différent de la somme
            ..IndexerProfile::default()
        };
        let (app, _wazuh, _indexer) = state_for(WazuhProfile::default(), indexer_profile).await;

        let snapshot = build_dashboard_metrics(&app).await.unwrap();
        assert_eq!(snapshot.total_alerts, 20);
        assert_eq!(snapshot.alerts_last_24hr, 20);
    }

    #[tokio::test]
    async fn missing_severity_buckets_default_to_zero() {
        let indexer_profile = IndexerProfile {
            bucket_counts: [
                ("Info".to_string(), 4),
                ("Minor".to_string(), 2),
                ("Major".to_string(), 1),
            ]
            .into_iter()
            .collect(),
            ..IndexerProfile::default()
        };
        let (app, _wazuh, _indexer) = state_for(WazuhProfile::default(), indexer_profile).await;

        let snapshot = build_dashboard_metrics(&app).await.unwrap();
        assert_eq!(snapshot.critical_alerts, 0);
        assert_eq!(snapshot.high_alerts, 1);
        assert_eq!(snapshot.medium_alerts, 2);
        assert_eq!(snapshot.low_alerts, 4);
        assert_eq!(snapshot.alerts_last_24hr, 7);
    }

    #[tokio::test]
    async fn empty_upstreams_yield_a_zeroed_snapshot() {
        let (app, _wazuh, _indexer) =
            state_for(WazuhProfile::default(), IndexerProfile::default()).await;

        let snapshot = build_dashboard_metrics(&app).await.unwrap();
        assert_eq!(snapshot.total_alerts, 0);
        assert_eq!(snapshot.alerts_last_24hr, 0);
        assert_eq!(snapshot.critical_alerts, 0);
        assert_eq!(snapshot.active_agents, 0);
        assert_eq!(snapshot.compliance_score, "0.0%");
        assert!(snapshot.alerts.is_empty());
    }

    #[tokio::test]
    async fn recent_alerts_keep_descending_order_and_projection() {
        let docs = vec![
            alert_doc(12, "brute force", "2026-08-07T10:05:00Z", "web-01", "agent-web", &["sshd", "authentication_failed"]),
            alert_doc(7, "new package", "2026-08-07T10:04:00Z", "db-01", "agent-db", &["syscheck"]),
            alert_doc(3, "login ok", "2026-08-07T10:03:00Z", "web-02", "agent-web2", &["sshd"]),
            alert_doc(9, "config change", "2026-08-07T10:02:00Z", "db-01", "agent-db", &["ossec"]),
            alert_doc(5, "cron run", "2026-08-07T10:01:00Z", "batch-01", "agent-batch", &["cron"]),
        ];
        let indexer_profile = IndexerProfile { recent_alerts: docs, ..IndexerProfile::default() };
        let profile = WazuhProfile {
            agents: agents(&[("001", Some(100.0))]),
            ..WazuhProfile::default()
        };
        let (app, _wazuh, _indexer) = state_for(profile, indexer_profile).await;

        let snapshot = build_dashboard_metrics(&app).await.unwrap();
        assert_eq!(snapshot.alerts.len(), 5);
        assert_eq!(snapshot.active_agents, 1);

        let times: Vec<&str> = snapshot.alerts.iter().filter_map(|a| a.time.as_deref()).collect();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(times, sorted);

        assert_eq!(snapshot.alerts[0].severity, Some(12));
        assert_eq!(snapshot.alerts[0].rule_groups, "sshd, authentication_failed");
        assert_eq!(snapshot.alerts[0].agent_name.as_deref(), Some("agent-web"));
    }

    #[tokio::test]
    async fn manager_health_flows_into_the_snapshot() {
        let profile = WazuhProfile {
            manager_status: Some("OK".into()),
            ..WazuhProfile::default()
        };
        let (app, _wazuh, _indexer) = state_for(profile, IndexerProfile::default()).await;

        let snapshot = build_dashboard_metrics(&app).await.unwrap();
        assert_eq!(snapshot.wazuh_health.as_deref(), Some("OK"));
    }

    #[tokio::test]
    async fn auth_failure_aborts_the_whole_snapshot() {
        let profile = WazuhProfile { reject_auth: true, ..WazuhProfile::default() };
        let (app, _wazuh, _indexer) = state_for(profile, IndexerProfile::default()).await;

        let err = build_dashboard_metrics(&app).await.unwrap_err();
        assert!(err.to_string().contains("Wazuh authentication failed"));
    }

    #[test]
    fn percentage_rendering_matches_dashboard_expectations() {
        assert_eq!(format_percentage(90.0), "90.0%");
        assert_eq!(format_percentage(85.68), "85.68%");
        assert_eq!(format_percentage(0.0), "0.0%");
        assert_eq!(format_percentage(100.0), "100.0%");
    }

    #[test]
    fn rounding_keeps_two_decimals() {
        let avg = (80.0_f64 + 85.0 + 92.0) / 3.0;
        assert_eq!((avg * 100.0).round() / 100.0, 85.67);
    }
}
