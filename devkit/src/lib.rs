/*!
# Watchtower DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant le développement de la passerelle sans
infrastructure Wazuh réelle:
- Stubs HTTP du manager Wazuh et de l'indexer d'alertes
- Builders de réponses upstream (enveloppes affected_items, documents d'alerte)
- Compteurs de requêtes pour assertions dans les tests
*/

pub mod stub_upstream;

pub use stub_upstream::{alert_doc, IndexerProfile, StubAgent, StubIndexer, StubWazuh, WazuhProfile};

/// Init logging pour tests, sans paniquer si déjà initialisé
pub fn init_test_logging() {
    env_logger::try_init().ok();
}
