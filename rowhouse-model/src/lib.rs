//! Runtime data model for Rowhouse.
//!
//! Defines the types every subsystem depends on:
//! - [`EntityDef`] and [`Property`]: the runtime-declared catalog
//! - [`Row`], [`RowValue`] and [`PropertyValue`]: stored records and their
//!   typed attribute payloads
//! - [`EntityRelationship`] / [`RowRelationship`]: the parent/child graph
//! - [`PermissionGrant`], [`EntityRule`] and [`RowAccess`]: sharing records
//! - [`EntityView`]: saved filter/sort/layout configurations
//! - [`WorkflowState`] / [`WorkflowStep`]: the per-entity state machine
//! - companion records: tags, comments, tasks, webhooks, audit entries
//!
//! Everything here is plain data with serde derives. Persistence lives in
//! `rowhouse-store`; orchestration and permission evaluation live in
//! `rowhouse-engine`.

mod audit;
mod comment;
mod entity;
mod error;
mod input;
mod permission;
mod property;
mod relationship;
mod row;
mod tag;
mod value;
mod view;
mod webhook;
mod workflow;

pub use audit::AuditEntry;
pub use comment::{RowComment, RowTask};
pub use entity::{EntityDef, EntityFeatures, Visibility};
pub use error::ModelError;
pub use input::{EdgeSpec, RowInput};
pub use permission::{
    AccessLevel, EntityAction, EntityRule, Grantee, PermissionGrant, RowAccess,
};
pub use property::{
    default_properties, validate_property_name, Property, PropertyAttribute, PropertyKind,
    PropertyOption,
};
pub use relationship::{Cardinality, EntityRelationship, RelationshipInput, RowRelationship};
pub use row::{format_folio, Row, RowValue};
pub use tag::{EntityTag, RowTag};
pub use value::{PropertyValue, RowMedia};
pub use view::{
    EntityView, FilterCondition, GroupBy, MatchMode, ViewFilter, ViewLayout, ViewScope, ViewSort,
};
pub use webhook::{default_webhooks, EntityWebhook, WebhookAction};
pub use workflow::{AssignTo, RowWorkflowTransition, WorkflowState, WorkflowStep};
