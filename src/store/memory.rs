//! In-memory store for testing the ensure logic without a live database.

use super::{AdminStore, SqlValue, StoreError};
use crate::domain::{DatabaseName, Principal, PrincipalGrant, PrincipalName, RoleGrant};
use crate::schema::{IndexSpec, RelationSpec};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct StoredPrincipal {
    secret: String,
    grants: BTreeSet<RoleGrant>,
}

#[derive(Debug)]
struct StoredRelation {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

#[derive(Debug)]
struct StoredIndex {
    relation: String,
    columns: Vec<String>,
    unique: bool,
}

#[derive(Debug, Default)]
struct State {
    databases: BTreeSet<String>,
    principals: BTreeMap<String, StoredPrincipal>,
    relations: BTreeMap<String, StoredRelation>,
    indexes: BTreeMap<String, StoredIndex>,
}

/// Behavior-compatible stand-in for the real store.
///
/// Records databases, principals with their grant sets, relations with their
/// rows, and indexes, and reports duplicates the way the real backend does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn unavailable() -> Self {
        MemoryStore {
            state: Mutex::new(State::default()),
            unavailable: true,
        }
    }

    /// Pre-create a database.
    pub fn with_database(self, name: &DatabaseName) -> Self {
        self.lock().databases.insert(name.as_str().to_string());
        self
    }

    /// Pre-create a principal with an arbitrary grant set.
    pub fn with_principal(self, name: &PrincipalName, grants: Vec<RoleGrant>) -> Self {
        self.lock().principals.insert(
            name.as_str().to_string(),
            StoredPrincipal {
                secret: String::new(),
                grants: grants.into_iter().collect(),
            },
        );
        self
    }

    /// Number of principals currently in the store.
    pub fn principal_count(&self) -> usize {
        self.lock().principals.len()
    }

    /// Names of relations currently in the store.
    pub fn relation_names(&self) -> Vec<String> {
        self.lock().relations.keys().cloned().collect()
    }

    /// Names of indexes currently in the store.
    pub fn index_names(&self) -> Vec<String> {
        self.lock().indexes.keys().cloned().collect()
    }

    /// Rows of a relation, or `None` if the relation does not exist.
    pub fn relation_rows(&self, relation: &str) -> Option<Vec<Vec<SqlValue>>> {
        self.lock().relations.get(relation).map(|r| r.rows.clone())
    }

    /// The stored credential of a principal, for assertions.
    pub fn secret_of(&self, name: &PrincipalName) -> Option<String> {
        self.lock()
            .principals
            .get(name.as_str())
            .map(|p| p.secret.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn database_exists(&self, name: &DatabaseName) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.lock().databases.contains(name.as_str()))
    }

    async fn create_database(&self, name: &DatabaseName) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock().databases.insert(name.as_str().to_string());
        Ok(())
    }

    async fn fetch_principal(
        &self,
        name: &PrincipalName,
    ) -> Result<Option<Principal>, StoreError> {
        self.check_available()?;
        let state = self.lock();
        Ok(state.principals.get(name.as_str()).map(|p| Principal {
            name: name.clone(),
            grants: p.grants.iter().cloned().collect(),
        }))
    }

    async fn create_principal(&self, grant: &PrincipalGrant) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        if state.principals.contains_key(grant.name.as_str()) {
            return Err(StoreError::DuplicatePrincipal(
                grant.name.as_str().to_string(),
            ));
        }
        state.principals.insert(
            grant.name.as_str().to_string(),
            StoredPrincipal {
                secret: grant.secret.clone(),
                grants: grant.grants.iter().cloned().collect(),
            },
        );
        Ok(())
    }

    async fn apply_grant(
        &self,
        principal: &PrincipalName,
        grant: &RoleGrant,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let stored = state
            .principals
            .get_mut(principal.as_str())
            .ok_or_else(|| StoreError::Query(format!("no such principal {}", principal)))?;
        stored.grants.insert(grant.clone());
        Ok(())
    }

    async fn revoke_grant(
        &self,
        principal: &PrincipalName,
        grant: &RoleGrant,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let stored = state
            .principals
            .get_mut(principal.as_str())
            .ok_or_else(|| StoreError::Query(format!("no such principal {}", principal)))?;
        stored.grants.remove(grant);
        Ok(())
    }

    async fn relation_exists(&self, relation: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.lock().relations.contains_key(relation))
    }

    async fn create_relation(&self, spec: &RelationSpec) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        state
            .relations
            .entry(spec.name.to_string())
            .or_insert_with(|| StoredRelation {
                columns: spec.column_names().iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
            });
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.lock().indexes.contains_key(name))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        if !state.relations.contains_key(spec.relation) {
            return Err(StoreError::UnknownRelation(spec.relation.to_string()));
        }
        state
            .indexes
            .entry(spec.name.to_string())
            .or_insert_with(|| StoredIndex {
                relation: spec.relation.to_string(),
                columns: spec.columns.iter().map(|c| c.to_string()).collect(),
                unique: spec.unique,
            });
        Ok(())
    }

    async fn row_count(&self, relation: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        let state = self.lock();
        let stored = state
            .relations
            .get(relation)
            .ok_or_else(|| StoreError::UnknownRelation(relation.to_string()))?;
        Ok(stored.rows.len() as u64)
    }

    async fn insert_rows(
        &self,
        relation: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let stored = state
            .relations
            .get_mut(relation)
            .ok_or_else(|| StoreError::UnknownRelation(relation.to_string()))?;
        for column in columns {
            if !stored.columns.iter().any(|c| c == column) {
                return Err(StoreError::Query(format!(
                    "relation {relation} has no column {column}"
                )));
            }
        }
        for row in rows {
            if row.len() != columns.len() {
                return Err(StoreError::Query(format!(
                    "row width {} does not match column list width {}",
                    row.len(),
                    columns.len()
                )));
            }
        }
        stored.rows.extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn names() -> (DatabaseName, PrincipalName) {
        (
            DatabaseName::new("video_streaming").unwrap(),
            PrincipalName::new("video_user").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_database_and_exists() {
        let (db, _) = names();
        let store = MemoryStore::new();
        assert!(!store.database_exists(&db).await.unwrap());
        store.create_database(&db).await.unwrap();
        assert!(store.database_exists(&db).await.unwrap());
    }

    #[tokio::test]
    async fn test_prepopulated_database_visible() {
        let (db, _) = names();
        let store = MemoryStore::new().with_database(&db);
        assert!(store.database_exists(&db).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_principal_rejected() {
        let (db, user) = names();
        let store = MemoryStore::new();
        let grant = PrincipalGrant::new(
            user.clone(),
            "pw".to_string(),
            vec![RoleGrant::new(Role::ReadWrite, db)],
        );
        store.create_principal(&grant).await.unwrap();
        assert_eq!(store.secret_of(&user), Some("pw".to_string()));

        let err = store.create_principal(&grant).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePrincipal(_)));
        assert_eq!(store.principal_count(), 1);
    }

    #[tokio::test]
    async fn test_grant_apply_and_revoke() {
        let (db, user) = names();
        let store = MemoryStore::new().with_principal(&user, vec![]);
        let grant = RoleGrant::new(Role::ReadOnly, db);

        store.apply_grant(&user, &grant).await.unwrap();
        let principal = store.fetch_principal(&user).await.unwrap().unwrap();
        assert_eq!(principal.grants, vec![grant.clone()]);

        store.revoke_grant(&user, &grant).await.unwrap();
        let principal = store.fetch_principal(&user).await.unwrap().unwrap();
        assert!(principal.grants.is_empty());
    }

    #[tokio::test]
    async fn test_insert_rows_and_count() {
        let store = MemoryStore::new();
        let relations = crate::schema::analytics_relations();
        let genres = relations.iter().find(|r| r.name == "content_genres").unwrap();
        store.create_relation(genres).await.unwrap();

        let rows = vec![
            vec![
                SqlValue::Text("m001".to_string()),
                SqlValue::Text("drama".to_string()),
            ],
            vec![
                SqlValue::Text("m001".to_string()),
                SqlValue::Text("thriller".to_string()),
            ],
        ];
        let inserted = store
            .insert_rows("content_genres", &["content_id", "genre"], &rows)
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.row_count("content_genres").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_into_missing_relation_fails() {
        let store = MemoryStore::new();
        let err = store.row_count("content").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownRelation(_)));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_ping() {
        let store = MemoryStore::unavailable();
        assert!(matches!(
            store.ping().await.unwrap_err(),
            StoreError::Unavailable(_)
        ));
    }
}
