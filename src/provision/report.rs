//! The outcome of a provisioning run, renderable as the operator summary.

use crate::domain::{DatabaseName, PrincipalName, RoleGrant};
use std::fmt;

/// What happened to the service principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalOutcome {
    /// Created fresh with the configured grant set.
    Created,
    /// Already present with exactly the configured grant set.
    Unchanged,
    /// Already present; grants were brought in line with the configured set.
    Reconciled {
        granted: Vec<RoleGrant>,
        revoked: Vec<RoleGrant>,
    },
}

/// What happened to one seed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOutcome {
    pub source: &'static str,
    pub status: SeedStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedStatus {
    /// Rows were loaded on this run.
    Loaded { rows: u64 },
    /// The target relation already held rows; nothing was loaded.
    SkippedExisting { rows: u64 },
}

/// Summary of everything a provisioning run ensured.
///
/// The rendered form names the target database verbatim and describes only
/// structures the run actually verified or created.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionReport {
    pub database: DatabaseName,
    pub database_created: bool,
    pub principal: PrincipalName,
    pub principal_outcome: PrincipalOutcome,
    pub relations_created: Vec<String>,
    pub indexes_created: Vec<String>,
    pub seeds: Vec<SeedOutcome>,
}

impl fmt::Display for ProvisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Provisioning complete for database: {}", self.database)?;
        writeln!(
            f,
            "  database: {}",
            if self.database_created {
                "created"
            } else {
                "already present"
            }
        )?;
        match &self.principal_outcome {
            PrincipalOutcome::Created => {
                writeln!(f, "  principal {}: created", self.principal)?;
            }
            PrincipalOutcome::Unchanged => {
                writeln!(f, "  principal {}: already present", self.principal)?;
            }
            PrincipalOutcome::Reconciled { granted, revoked } => {
                writeln!(
                    f,
                    "  principal {}: already present, grants reconciled ({} granted, {} revoked)",
                    self.principal,
                    granted.len(),
                    revoked.len()
                )?;
            }
        }
        if self.relations_created.is_empty() {
            writeln!(f, "  relations: all present")?;
        } else {
            writeln!(f, "  relations created: {}", self.relations_created.join(", "))?;
        }
        if self.indexes_created.is_empty() {
            writeln!(f, "  indexes: all present")?;
        } else {
            writeln!(f, "  indexes created: {}", self.indexes_created.join(", "))?;
        }
        if self.seeds.is_empty() {
            writeln!(f, "  seed data: not configured")?;
        } else {
            for seed in &self.seeds {
                match seed.status {
                    SeedStatus::Loaded { rows } => {
                        writeln!(f, "  seed {}: loaded {} rows", seed.source, rows)?;
                    }
                    SeedStatus::SkippedExisting { rows } => {
                        writeln!(
                            f,
                            "  seed {}: skipped, {} rows already present",
                            seed.source, rows
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> ProvisionReport {
        ProvisionReport {
            database: DatabaseName::new("video_streaming").unwrap(),
            database_created: true,
            principal: PrincipalName::new("video_user").unwrap(),
            principal_outcome: PrincipalOutcome::Created,
            relations_created: vec!["content".to_string(), "users".to_string()],
            indexes_created: vec!["idx_content_rating".to_string()],
            seeds: vec![SeedOutcome {
                source: "content catalog",
                status: SeedStatus::Loaded { rows: 12 },
            }],
        }
    }

    #[test]
    fn test_report_names_database_verbatim() {
        let rendered = sample_report().to_string();
        assert!(rendered.contains("video_streaming"));
    }

    #[test]
    fn test_report_describes_created_structures() {
        let rendered = sample_report().to_string();
        assert!(rendered.contains("principal video_user: created"));
        assert!(rendered.contains("relations created: content, users"));
        assert!(rendered.contains("seed content catalog: loaded 12 rows"));
    }

    #[test]
    fn test_noop_rerun_report() {
        let report = ProvisionReport {
            database_created: false,
            principal_outcome: PrincipalOutcome::Unchanged,
            relations_created: vec![],
            indexes_created: vec![],
            seeds: vec![SeedOutcome {
                source: "content catalog",
                status: SeedStatus::SkippedExisting { rows: 12 },
            }],
            ..sample_report()
        };
        let rendered = report.to_string();
        assert!(rendered.contains("database: already present"));
        assert!(rendered.contains("relations: all present"));
        assert!(rendered.contains("skipped, 12 rows already present"));
    }
}
