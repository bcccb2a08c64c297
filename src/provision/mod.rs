//! The provisioning run: ensure database, principal, schema, and seed data,
//! in that order, against any [`AdminStore`].

use crate::config::Config;
use crate::domain::RoleGrant;
use crate::schema::{analytics_indexes, analytics_relations};
use crate::seed::{self, SeedBatch, SeedError};
use crate::store::{AdminStore, StoreError};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub mod report;

pub use report::{PrincipalOutcome, ProvisionReport, SeedOutcome, SeedStatus};

/// One-shot provisioner for the analytics database.
///
/// Every stage is idempotent; running the provisioner against an
/// already-provisioned store succeeds and changes nothing.
pub struct Provisioner {
    store: Arc<dyn AdminStore>,
    config: Config,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Seed(#[from] SeedError),
}

impl Provisioner {
    pub fn new(store: Arc<dyn AdminStore>, config: Config) -> Self {
        Provisioner { store, config }
    }

    /// Run all provisioning stages in order. A failed stage aborts the run;
    /// the tool is safe to re-run after the cause is fixed.
    pub async fn run(&self) -> Result<ProvisionReport, ProvisionError> {
        self.store.ping().await?;

        let database_created = self.ensure_database().await?;
        let principal_outcome = self.ensure_principal().await?;
        let (relations_created, indexes_created) = self.ensure_schema().await?;
        let seeds = self.seed().await?;

        let report = ProvisionReport {
            database: self.config.database.clone(),
            database_created,
            principal: self.config.app_user.clone(),
            principal_outcome,
            relations_created,
            indexes_created,
            seeds,
        };
        info!("provisioning run finished for {}", report.database);
        Ok(report)
    }

    /// Create the target database if it does not exist. Returns whether it
    /// was created by this run.
    pub async fn ensure_database(&self) -> Result<bool, ProvisionError> {
        let database = &self.config.database;
        if self.store.database_exists(database).await? {
            info!("database {} already present", database);
            return Ok(false);
        }
        match self.store.create_database(database).await {
            Ok(()) => {
                info!("created database {}", database);
                Ok(true)
            }
            // A concurrent creator won the race; the end state is the same.
            Err(StoreError::DuplicateDatabase(_)) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    /// Ensure the service principal exists and holds exactly the configured
    /// grant set.
    ///
    /// An existing principal is never an error: surplus grants within this
    /// tool's vocabulary are revoked and missing ones applied. A concurrent
    /// creator winning the create race is folded into the same path.
    pub async fn ensure_principal(&self) -> Result<PrincipalOutcome, ProvisionError> {
        let desired = self.config.principal_grant();

        let existing = match self.store.fetch_principal(&desired.name).await? {
            Some(principal) => Some(principal),
            None => match self.store.create_principal(&desired).await {
                Ok(()) => {
                    info!(
                        "created principal {} with grants [{}]",
                        desired.name,
                        desired
                            .grants
                            .iter()
                            .map(|g| g.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    return Ok(PrincipalOutcome::Created);
                }
                Err(StoreError::DuplicatePrincipal(_)) => {
                    self.store.fetch_principal(&desired.name).await?
                }
                Err(other) => return Err(other.into()),
            },
        };

        let existing = match existing {
            Some(principal) => principal,
            // Lost the race and then the principal vanished again; nothing
            // sane to reconcile against.
            None => {
                return Err(ProvisionError::Store(StoreError::Query(format!(
                    "principal {} disappeared during reconciliation",
                    desired.name
                ))))
            }
        };

        let desired_set: BTreeSet<RoleGrant> = desired.grants.iter().cloned().collect();
        let current_set: BTreeSet<RoleGrant> = existing.grants.iter().cloned().collect();

        let granted: Vec<RoleGrant> = desired_set.difference(&current_set).cloned().collect();
        let revoked: Vec<RoleGrant> = current_set.difference(&desired_set).cloned().collect();

        if granted.is_empty() && revoked.is_empty() {
            info!("principal {} already holds the configured grants", desired.name);
            return Ok(PrincipalOutcome::Unchanged);
        }

        for grant in &granted {
            self.store.apply_grant(&desired.name, grant).await?;
            info!("granted {} to {}", grant, desired.name);
        }
        for grant in &revoked {
            self.store.revoke_grant(&desired.name, grant).await?;
            info!("revoked {} from {}", grant, desired.name);
        }

        Ok(PrincipalOutcome::Reconciled { granted, revoked })
    }

    /// Create every missing relation and index of the analytics schema.
    /// Existing relations are left untouched.
    pub async fn ensure_schema(&self) -> Result<(Vec<String>, Vec<String>), ProvisionError> {
        let mut relations_created = Vec::new();
        for relation in analytics_relations() {
            if self.store.relation_exists(relation.name).await? {
                continue;
            }
            self.store.create_relation(&relation).await?;
            info!("created relation {}", relation.name);
            relations_created.push(relation.name.to_string());
        }

        let mut indexes_created = Vec::new();
        for index in analytics_indexes() {
            if self.store.index_exists(index.name).await? {
                continue;
            }
            self.store.create_index(&index).await?;
            info!("created index {} on {}", index.name, index.relation);
            indexes_created.push(index.name.to_string());
        }

        Ok((relations_created, indexes_created))
    }

    /// Load the configured seed sources. A source whose target relation
    /// already holds rows is skipped, so re-runs never duplicate data.
    pub async fn seed(&self) -> Result<Vec<SeedOutcome>, ProvisionError> {
        let mut outcomes = Vec::new();

        if let Some(path) = &self.config.seed_content_json {
            let existing = self.store.row_count("content").await?;
            if existing > 0 {
                info!(
                    "content relation already holds {} rows, skipping catalog seed",
                    existing
                );
                outcomes.push(SeedOutcome {
                    source: "content catalog",
                    status: SeedStatus::SkippedExisting { rows: existing },
                });
            } else {
                let catalog = seed::load_catalog(path)?;
                let mut loaded = 0u64;
                for batch in seed::normalize_catalog(&catalog) {
                    loaded += self
                        .store
                        .insert_rows(batch.relation, batch.columns, &batch.rows)
                        .await?;
                }
                info!("loaded {} catalog rows from {}", loaded, path.display());
                outcomes.push(SeedOutcome {
                    source: "content catalog",
                    status: SeedStatus::Loaded { rows: loaded },
                });
            }
        }

        if let Some(dir) = &self.config.seed_snapshot_dir {
            outcomes.push(
                self.seed_snapshot(
                    "users snapshot",
                    "users",
                    &dir.join(seed::USERS_FILE),
                    seed::load_users,
                )
                .await?,
            );
            outcomes.push(
                self.seed_snapshot(
                    "viewing sessions snapshot",
                    "viewing_sessions",
                    &dir.join(seed::SESSIONS_FILE),
                    seed::load_sessions,
                )
                .await?,
            );
        }

        Ok(outcomes)
    }

    async fn seed_snapshot(
        &self,
        source: &'static str,
        relation: &str,
        path: &Path,
        load: fn(&Path) -> Result<SeedBatch, SeedError>,
    ) -> Result<SeedOutcome, ProvisionError> {
        let existing = self.store.row_count(relation).await?;
        if existing > 0 {
            info!(
                "relation {} already holds {} rows, skipping {}",
                relation, existing, source
            );
            return Ok(SeedOutcome {
                source,
                status: SeedStatus::SkippedExisting { rows: existing },
            });
        }
        let batch = load(path)?;
        let loaded = self
            .store
            .insert_rows(batch.relation, batch.columns, &batch.rows)
            .await?;
        info!("loaded {} rows into {} from {}", loaded, relation, path.display());
        Ok(SeedOutcome {
            source,
            status: SeedStatus::Loaded { rows: loaded },
        })
    }
}
