//! SQLite storage layer for Rowhouse.
//!
//! One shared connection behind a mutex; every facade clones the same
//! [`Database`] handle, so writes serialize and multi-statement operations
//! run as real transactions.
//!
//! # Architecture
//!
//! - Catalog records (entities, properties, relationships, webhooks) in
//!   `catalog`
//! - Row data (rows, values, edges, tags, comments, tasks) in `rows`
//! - Access-control directory in `permissions`
//! - Saved views, workflow definitions and the audit trail in their own
//!   facades
//!
//! Identifiers are stored as UUID strings, timestamps as epoch milliseconds,
//! structured payloads as JSON text. The schema is applied idempotently on
//! open.

mod audit;
mod catalog;
mod database;
mod error;
mod permissions;
mod rows;
mod schema;
mod views;
mod workflow;

pub use audit::AuditStore;
pub use catalog::CatalogStore;
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use permissions::PermissionStore;
pub use rows::RowStore;
pub use views::ViewStore;
pub use workflow::WorkflowStore;
