//! Administrative store abstraction.
//!
//! The provisioner talks to the target store only through [`AdminStore`], so
//! the ensure logic can be exercised against [`MemoryStore`] without a live
//! database. [`PgStore`] is the real backend.

use crate::domain::{DatabaseName, Principal, PrincipalGrant, PrincipalName, RoleGrant};
use crate::schema::{IndexSpec, RelationSpec};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A typed cell value for seed rows.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Numeric(Decimal),
    Date(NaiveDate),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Text(s) => write!(f, "{s}"),
            SqlValue::Int(i) => write!(f, "{i}"),
            SqlValue::Numeric(d) => write!(f, "{d}"),
            SqlValue::Date(d) => write!(f, "{d}"),
        }
    }
}

/// Error type for administrative store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is not reachable (connection refused, timed out).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The principal already exists in the store.
    #[error("principal {0:?} already exists")]
    DuplicatePrincipal(String),
    /// The database already exists in the store.
    #[error("database {0:?} already exists")]
    DuplicateDatabase(String),
    /// The invoking session lacks the privilege for an administrative request.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// A request referenced a relation the store does not have.
    #[error("unknown relation {0:?}")]
    UnknownRelation(String),
    /// Any other rejected request.
    #[error("administrative request rejected: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // duplicate_object
                Some("42710") => StoreError::DuplicatePrincipal(db.to_string()),
                // duplicate_database
                Some("42P04") => StoreError::DuplicateDatabase(db.to_string()),
                // insufficient_privilege
                Some("42501") => StoreError::PermissionDenied(db.to_string()),
                // undefined_table
                Some("42P01") => StoreError::UnknownRelation(db.to_string()),
                _ => StoreError::Query(err.to_string()),
            },
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// The administrative surface of the target store.
///
/// Every method is idempotence-friendly: existence checks are separate from
/// creation, and creation of an already-present principal reports
/// [`StoreError::DuplicatePrincipal`] rather than a generic failure so the
/// caller can treat the race as "already exists".
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Verify the store accepts requests.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn database_exists(&self, name: &DatabaseName) -> Result<bool, StoreError>;

    async fn create_database(&self, name: &DatabaseName) -> Result<(), StoreError>;

    /// Fetch a principal and the grants it holds, or `None` if absent.
    ///
    /// Only grants within this tool's role vocabulary are reported; grants
    /// issued out of band are invisible here and are never touched.
    async fn fetch_principal(
        &self,
        name: &PrincipalName,
    ) -> Result<Option<Principal>, StoreError>;

    /// Create a principal with its credential and initial grant set.
    async fn create_principal(&self, grant: &PrincipalGrant) -> Result<(), StoreError>;

    async fn apply_grant(
        &self,
        principal: &PrincipalName,
        grant: &RoleGrant,
    ) -> Result<(), StoreError>;

    async fn revoke_grant(
        &self,
        principal: &PrincipalName,
        grant: &RoleGrant,
    ) -> Result<(), StoreError>;

    async fn relation_exists(&self, relation: &str) -> Result<bool, StoreError>;

    async fn create_relation(&self, spec: &RelationSpec) -> Result<(), StoreError>;

    async fn index_exists(&self, name: &str) -> Result<bool, StoreError>;

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError>;

    async fn row_count(&self, relation: &str) -> Result<u64, StoreError>;

    /// Insert rows into a relation. All rows land or none do.
    async fn insert_rows(
        &self,
        relation: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "store unavailable: connection refused");

        let err = StoreError::DuplicatePrincipal("video_user".to_string());
        assert_eq!(err.to_string(), "principal \"video_user\" already exists");

        let err = StoreError::UnknownRelation("contnet".to_string());
        assert_eq!(err.to_string(), "unknown relation \"contnet\"");
    }

    #[test]
    fn test_sql_value_display() {
        assert_eq!(SqlValue::Text("drama".to_string()).to_string(), "drama");
        assert_eq!(SqlValue::Int(42).to_string(), "42");
        assert_eq!(
            SqlValue::Date(NaiveDate::from_ymd_opt(2023, 5, 14).unwrap()).to_string(),
            "2023-05-14"
        );
    }
}
