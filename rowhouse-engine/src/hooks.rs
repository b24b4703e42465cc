//! Host integration points.
//!
//! The engine owns rows, permissions and audit; everything it cannot decide
//! alone (blob storage, plan limits, outbound webhooks, user lookups) goes
//! through one of these traits. Every method has a no-op default so hosts
//! implement only what they care about, and the unit structs below serve as
//! the defaults wired into a fresh engine.

use crate::error::EngineResult;
use async_trait::async_trait;
use rowhouse_model::{EntityDef, EntityWebhook, Row, RowInput, RowMedia};
use rowhouse_types::{RowId, TenantId, UserId};

/// Callbacks around the row lifecycle.
///
/// `before_*` hooks run after validation but before any write and may veto
/// the operation by returning an error. `after_*` hooks are notifications;
/// their outcome cannot affect the already-committed change. Reads get the
/// same pairing so hosts can veto or observe them too.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    async fn before_create(&self, _entity: &EntityDef, _input: &RowInput) -> EngineResult<()> {
        Ok(())
    }

    async fn after_create(&self, _entity: &EntityDef, _row: &Row) {}

    async fn before_update(
        &self,
        _entity: &EntityDef,
        _row: &Row,
        _input: &RowInput,
    ) -> EngineResult<()> {
        Ok(())
    }

    async fn after_update(&self, _entity: &EntityDef, _row: &Row) {}

    async fn before_delete(&self, _entity: &EntityDef, _row: &Row) -> EngineResult<()> {
        Ok(())
    }

    async fn after_delete(&self, _entity: &EntityDef, _row: &Row) {}

    async fn before_list(&self, _entity: &EntityDef) -> EngineResult<()> {
        Ok(())
    }

    async fn after_list(&self, _entity: &EntityDef, _rows: &[Row]) {}

    async fn before_get(&self, _entity: &EntityDef, _id: RowId) -> EngineResult<()> {
        Ok(())
    }

    async fn after_get(&self, _entity: &EntityDef, _row: &Row) {}
}

/// Default hooks: every callback is a no-op.
pub struct NoopHooks;

#[async_trait]
impl LifecycleHooks for NoopHooks {}

/// Persists media payloads submitted inline with row values.
///
/// `store_media` receives an item still carrying base64 content and returns
/// it rewritten with a URL (and optionally a bucket). The engine stores
/// whatever comes back.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store_media(
        &self,
        _entity: &EntityDef,
        _row_id: RowId,
        media: RowMedia,
    ) -> EngineResult<RowMedia> {
        Ok(media)
    }

    async fn delete_media(&self, _row_id: RowId, _media: &RowMedia) -> EngineResult<()> {
        Ok(())
    }
}

/// Default media store: content stays inline, nothing is uploaded.
pub struct InlineMedia;

#[async_trait]
impl MediaStore for InlineMedia {}

/// Outcome of a usage-limit check.
#[derive(Debug, Clone)]
pub struct UsageVerdict {
    pub limit_reached: bool,
    /// Message surfaced to the caller when the limit is reached.
    pub message: String,
}

impl UsageVerdict {
    /// Within limits.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            limit_reached: false,
            message: String::new(),
        }
    }

    /// Limit reached, with the message to surface.
    #[must_use]
    pub fn blocked(message: &str) -> Self {
        Self {
            limit_reached: true,
            message: message.into(),
        }
    }
}

/// Plan/quota enforcement supplied by the host.
#[async_trait]
pub trait UsageMeter: Send + Sync {
    /// Called before a row is created; a blocked verdict aborts the create.
    async fn check_limit(&self, _tenant_id: Option<TenantId>, _entity_name: &str) -> UsageVerdict {
        UsageVerdict::ok()
    }

    /// Called after a row is created. Failures are logged, never propagated.
    async fn report(&self, _tenant_id: Option<TenantId>, _entity_name: &str) {}
}

/// Default meter: nothing is counted, nothing is limited.
pub struct Unmetered;

#[async_trait]
impl UsageMeter for Unmetered {}

/// Delivers configured webhooks after row mutations.
///
/// The engine looks up the entity's webhook for the action and calls `emit`
/// once per mutation; delivery, retries and signing are the sink's problem.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn emit(&self, _webhook: &EntityWebhook, _payload: &serde_json::Value) -> EngineResult<()> {
        Ok(())
    }
}

/// Default sink: webhooks are dropped.
pub struct NullSink;

#[async_trait]
impl WebhookSink for NullSink {}

/// Identity fields of a user, for free-text search over row creators.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub email: String,
    pub full_name: String,
}

/// Resolves user ids to profiles.
///
/// Only the `q` search parameter consults this; with the default directory
/// creator fields simply never match.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup(&self, _user_id: UserId) -> Option<UserProfile> {
        None
    }
}

/// Default directory: every lookup misses.
pub struct EmptyDirectory;

#[async_trait]
impl UserDirectory for EmptyDirectory {}
