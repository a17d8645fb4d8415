use serde::Serialize;
use serde_json::Value;

/// Échelles de sévérité appliquées au champ numérique rule.level.
/// Chaque échelle est un contrat nommé et figé, pas une énumération ouverte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityScale {
    /// Comptage global, sans filtre temporel
    AllTime,
    /// Fenêtre glissante des dernières 24 heures
    Last24h,
    /// Découpage Low/Medium/High/Critical de l'endpoint de diagnostic
    Diagnostic,
}

#[derive(Debug, Clone, Copy)]
pub struct SeverityRange {
    pub key: &'static str,
    pub from: Option<u32>,
    pub to: Option<u32>,
}

impl SeverityScale {
    pub const fn ranges(self) -> &'static [SeverityRange] {
        match self {
            SeverityScale::AllTime => &[
                SeverityRange { key: "Info", from: None, to: Some(6) },
                SeverityRange { key: "Minor", from: Some(7), to: Some(11) },
                SeverityRange { key: "Major", from: Some(11), to: Some(13) },
                SeverityRange { key: "Critical", from: Some(13), to: None },
            ],
            SeverityScale::Last24h => &[
                SeverityRange { key: "Info", from: None, to: Some(7) },
                SeverityRange { key: "Minor", from: Some(7), to: Some(11) },
                SeverityRange { key: "Major", from: Some(11), to: Some(13) },
                SeverityRange { key: "Critical", from: Some(13), to: None },
            ],
            SeverityScale::Diagnostic => &[
                SeverityRange { key: "Low", from: None, to: Some(6) },
                SeverityRange { key: "Medium", from: Some(6), to: Some(12) },
                SeverityRange { key: "High", from: Some(12), to: Some(15) },
                SeverityRange { key: "Critical", from: Some(15), to: None },
            ],
        }
    }

    /// Ranges au format attendu par l'agrégation range de l'indexer.
    /// Les bornes absentes sont omises du JSON, pas envoyées à null.
    pub fn query_ranges(self) -> Vec<Value> {
        self.ranges()
            .iter()
            .map(|r| {
                let mut obj = serde_json::Map::new();
                obj.insert("key".into(), r.key.into());
                if let Some(from) = r.from {
                    obj.insert("from".into(), from.into());
                }
                if let Some(to) = r.to {
                    obj.insert("to".into(), to.into());
                }
                Value::Object(obj)
            })
            .collect()
    }
}

/// Projection aplatie d'un document d'alerte de l'indexer
#[derive(Debug, Clone, Serialize)]
pub struct AlertView {
    pub severity: Option<u32>,
    pub alert_description: Option<String>,
    pub time: Option<String>,
    pub host_name: Option<String>,
    pub agent_name: Option<String>,
    pub rule_groups: String, // groupes de règles joints par ", "
}

/// Snapshot agrégé renvoyé par /dashboard-metrics.
/// open_tickets, resolved_today et avg_response_time restent des placeholders
/// tant que l'intégration ticketing n'existe pas; le schéma les conserve.
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_alerts: u64,
    pub alerts_last_24hr: u64,
    pub critical_alerts: u64,
    pub high_alerts: u64,
    pub medium_alerts: u64,
    pub low_alerts: u64,
    pub open_tickets: u64,
    pub resolved_today: u64,
    pub avg_response_time: String,
    pub compliance_score: String, // format "<float>%"
    pub active_agents: u64,
    pub wazuh_health: Option<String>,
    pub alerts: Vec<AlertView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_time_scale_matches_contract() {
        let ranges = SeverityScale::AllTime.ranges();
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0].key, "Info");
        assert_eq!(ranges[0].to, Some(6));
        assert_eq!(ranges[0].from, None);
        assert_eq!(ranges[3].key, "Critical");
        assert_eq!(ranges[3].from, Some(13));
        assert_eq!(ranges[3].to, None);
    }

    #[test]
    fn last_24h_scale_widens_info_bucket() {
        let ranges = SeverityScale::Last24h.ranges();
        assert_eq!(ranges[0].key, "Info");
        assert_eq!(ranges[0].to, Some(7));
        // les trois autres buckets sont identiques à l'échelle globale
        assert_eq!(ranges[1].from, Some(7));
        assert_eq!(ranges[2].from, Some(11));
        assert_eq!(ranges[3].from, Some(13));
    }

    #[test]
    fn diagnostic_scale_uses_its_own_names() {
        let keys: Vec<&str> = SeverityScale::Diagnostic.ranges().iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["Low", "Medium", "High", "Critical"]);
    }

    #[test]
    fn query_ranges_omit_absent_bounds() {
        let ranges = SeverityScale::AllTime.query_ranges();
        assert_eq!(ranges[0]["key"], "Info");
        assert!(ranges[0].get("from").is_none());
        assert_eq!(ranges[0]["to"], 6);
        assert!(ranges[3].get("to").is_none());
        assert_eq!(ranges[3]["from"], 13);
    }
}
