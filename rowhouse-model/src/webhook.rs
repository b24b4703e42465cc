use rowhouse_types::{EntityId, WebhookId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row lifecycle moments a webhook can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAction {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for WebhookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

/// An outbound webhook registration for an entity.
///
/// Three slots (created/updated/deleted) are seeded with every entity; they
/// stay inert until the host fills in an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityWebhook {
    pub id: WebhookId,
    pub entity_id: EntityId,
    pub action: WebhookAction,
    pub method: String,
    /// Target URL; empty until configured.
    pub endpoint: String,
    pub active: bool,
}

impl EntityWebhook {
    /// True when the webhook should actually fire.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.active && !self.endpoint.is_empty()
    }
}

/// The three webhook slots seeded when an entity is created.
#[must_use]
pub fn default_webhooks(entity_id: EntityId) -> Vec<EntityWebhook> {
    [
        WebhookAction::Created,
        WebhookAction::Updated,
        WebhookAction::Deleted,
    ]
    .into_iter()
    .map(|action| EntityWebhook {
        id: WebhookId::new(),
        entity_id,
        action,
        method: "POST".into(),
        endpoint: String::new(),
        active: false,
    })
    .collect()
}
