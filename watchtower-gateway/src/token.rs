/**
 * CACHE DE TOKEN - Session manager Wazuh avec renouvellement anticipé
 *
 * RÔLE :
 * Ce module garde en mémoire l'unique token de session du manager et le
 * renouvelle avant expiration pour éviter une authentification par requête.
 *
 * FONCTIONNEMENT :
 * - Le manager émet des tokens valables 900s (contrat upstream)
 * - Le cache renouvelle 30s avant l'échéance (marge de sécurité horloge)
 * - Renouvellement single-flight : le mutex est tenu pendant l'appel
 *   d'authentification, les appels concurrents attendent le même résultat
 * - Aucune persistance : un redémarrage repart sans token
 */

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::errors::GatewayError;
use crate::health::HealthTracker;
use crate::wazuh::WazuhClient;

/// Durée de vie d'un token de session, fixée par le manager
pub const TOKEN_TTL: Duration = Duration::from_secs(900);
/// Marge de renouvellement avant l'échéance
pub const RENEWAL_SKEW: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct CachedToken {
    value: String,
    issued_at: Instant,
}

#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<Mutex<Option<CachedToken>>>,
    health: HealthTracker,
}

impl TokenCache {
    pub fn new(health: HealthTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            health,
        }
    }

    /// Token valide, renouvelé si absent ou trop proche de l'échéance.
    /// Le token renvoyé est une copie, jamais une référence sur le slot.
    pub async fn get_valid_token(&self, wazuh: &WazuhClient) -> Result<String, GatewayError> {
        let mut slot = self.inner.lock().await;

        if let Some(cached) = slot.as_ref() {
            if token_still_fresh(cached.issued_at.elapsed()) {
                return Ok(cached.value.clone());
            }
        }

        tracing::info!("renouvellement du token de session Wazuh");
        let value = wazuh.authenticate().await?;
        self.health.mark_token_renewal();
        tracing::info!("token Wazuh acquis");

        *slot = Some(CachedToken { value: value.clone(), issued_at: Instant::now() });
        Ok(value)
    }

    /// Vieillit artificiellement le token en place, pour les tests
    #[cfg(test)]
    pub(crate) async fn age_cached_token(&self, age: Duration) {
        if let Some(cached) = self.inner.lock().await.as_mut() {
            if let Some(back_dated) = Instant::now().checked_sub(age) {
                cached.issued_at = back_dated;
            }
        }
    }
}

/// Un token reste utilisable tant que son âge est sous TTL - marge
fn token_still_fresh(age: Duration) -> bool {
    age < TOKEN_TTL - RENEWAL_SKEW
}
