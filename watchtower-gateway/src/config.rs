use anyhow::{bail, Result};

/// Configuration statique de la passerelle, chargée une fois au démarrage.
/// Les credentials upstream sont obligatoires, le reste a des défauts.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub wazuh_host: String,   // ex: https://192.168.1.12:55000
    pub wazuh_user: String,
    pub wazuh_pass: String,
    pub indexer_host: String, // ex: https://192.168.1.12:9200
    pub indexer_user: String,
    pub indexer_pass: String,
    /// Accepte les certificats auto-signés des upstreams.
    /// Les installations Wazuh livrent des certs auto-signés par défaut.
    pub insecure_tls: bool,
    pub http_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: parse_u16(std::env::var("PORT").ok(), 4000),
            wazuh_host: required("WAZUH_HOST")?,
            wazuh_user: required("WAZUH_USER")?,
            wazuh_pass: required("WAZUH_PASS")?,
            indexer_host: required("INDEXER_HOST")?,
            indexer_user: required("INDEXER_USER")?,
            indexer_pass: required("INDEXER_PASS")?,
            insecure_tls: parse_bool(std::env::var("WATCHTOWER_INSECURE_TLS").ok(), true),
            http_timeout_secs: parse_u64(std::env::var("WATCHTOWER_HTTP_TIMEOUT_SECS").ok(), 10),
        })
    }
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("variable d'environnement requise: {name}"),
    }
}

fn parse_u16(raw: Option<String>, default: u16) -> u16 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_bool(raw: Option<String>, default: bool) -> bool {
    raw.map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(default)
}
