//! PostgreSQL backend for the administrative store.
//!
//! Instance-level operations (databases, roles) run on a pool connected to
//! the maintenance database; schema and seed operations run on a pool to
//! the target database, opened lazily once that database exists.
//!
//! A (role, database) grant is realized as membership in a group role named
//! `<database>_<role>` that carries the privilege set; this keeps the grant
//! set queryable, so reconciliation can compute exactly what to grant and
//! revoke.

use super::{AdminStore, SqlValue, StoreError};
use crate::config::Config;
use crate::domain::{DatabaseName, Principal, PrincipalGrant, PrincipalName, Role, RoleGrant};
use crate::schema::{ColumnType, IndexSpec, RelationSpec};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// The always-present database an administrator connects to for
/// instance-level DDL.
const MAINTENANCE_DB: &str = "postgres";

/// PostgreSQL-backed administrative store.
pub struct PgStore {
    admin: PgPool,
    target_opts: PgConnectOptions,
    target_db: DatabaseName,
    target: OnceCell<PgPool>,
}

impl PgStore {
    /// Connect to the store's maintenance database, retrying with
    /// exponential backoff until the store accepts connections or the
    /// configured timeout elapses.
    ///
    /// The provisioner typically starts alongside the store container, so
    /// refused connections are expected at first.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let admin_opts = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.admin_user)
            .password(&config.admin_password)
            .database(MAINTENANCE_DB);
        let target_opts = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.admin_user)
            .password(&config.admin_password)
            .database(config.database.as_str());

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(config.connect_timeout_secs)),
            ..Default::default()
        };

        let admin = retry(backoff, || async {
            PgPoolOptions::new()
                .max_connections(2)
                .connect_with(admin_opts.clone())
                .await
                .map_err(|e| match e {
                    // Authentication and protocol rejections will not heal
                    // by waiting; refused/reset connections will.
                    sqlx::Error::Database(_) => backoff::Error::permanent(e),
                    other => {
                        debug!("store not ready yet: {}", other);
                        backoff::Error::transient(other)
                    }
                })
        })
        .await
        .map_err(StoreError::from)?;

        info!("connected to store at {}:{}", config.host, config.port);
        Ok(PgStore {
            admin,
            target_opts,
            target_db: config.database.clone(),
            target: OnceCell::new(),
        })
    }

    async fn target_pool(&self) -> Result<&PgPool, StoreError> {
        self.target
            .get_or_try_init(|| async {
                PgPoolOptions::new()
                    .max_connections(4)
                    .connect_with(self.target_opts.clone())
                    .await
                    .map_err(StoreError::from)
            })
            .await
    }

    async fn group_role_exists(&self, name: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM pg_roles WHERE rolname = $1")
            .bind(name)
            .fetch_optional(&self.admin)
            .await?;
        Ok(row.is_some())
    }

    /// Create the group role carrying the privilege set of `grant`, if it
    /// does not already exist.
    async fn ensure_group_role(&self, grant: &RoleGrant) -> Result<String, StoreError> {
        let group = group_role_name(&grant.database, grant.role);
        if self.group_role_exists(&group).await? {
            return Ok(group);
        }

        let quoted_group = quote_ident(&group);
        let quoted_db = quote_ident(grant.database.as_str());

        sqlx::query(&format!("CREATE ROLE {quoted_group} NOLOGIN"))
            .execute(&self.admin)
            .await?;
        sqlx::query(&format!(
            "GRANT CONNECT ON DATABASE {quoted_db} TO {quoted_group}"
        ))
        .execute(&self.admin)
        .await?;

        let target = self.target_pool().await?;
        let table_privileges = match grant.role {
            Role::ReadWrite => "SELECT, INSERT, UPDATE, DELETE",
            Role::ReadOnly => "SELECT",
        };
        sqlx::query(&format!("GRANT USAGE ON SCHEMA public TO {quoted_group}"))
            .execute(target)
            .await?;
        sqlx::query(&format!(
            "GRANT {table_privileges} ON ALL TABLES IN SCHEMA public TO {quoted_group}"
        ))
        .execute(target)
        .await?;
        // Relations the provisioner creates after this point are covered by
        // the default-privilege rule rather than the ALL TABLES sweep.
        sqlx::query(&format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT {table_privileges} ON TABLES TO {quoted_group}"
        ))
        .execute(target)
        .await?;
        if grant.role == Role::ReadWrite {
            sqlx::query(&format!(
                "GRANT USAGE, SELECT ON ALL SEQUENCES IN SCHEMA public TO {quoted_group}"
            ))
            .execute(target)
            .await?;
            sqlx::query(&format!(
                "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT USAGE, SELECT ON SEQUENCES TO {quoted_group}"
            ))
            .execute(target)
            .await?;
        }

        info!("created group role {} for {}", group, grant);
        Ok(group)
    }

    fn check_grant_scope(&self, grant: &RoleGrant) -> Result<(), StoreError> {
        if grant.database != self.target_db {
            return Err(StoreError::Query(format!(
                "grant scope {} is not the provisioned database {}",
                grant.database, self.target_db
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.admin).await?;
        Ok(())
    }

    async fn database_exists(&self, name: &DatabaseName) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(name.as_str())
            .fetch_optional(&self.admin)
            .await?;
        Ok(row.is_some())
    }

    async fn create_database(&self, name: &DatabaseName) -> Result<(), StoreError> {
        // CREATE DATABASE cannot be parameterized; the name is a validated
        // identifier and is quoted regardless.
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(name.as_str())))
            .execute(&self.admin)
            .await?;
        Ok(())
    }

    async fn fetch_principal(
        &self,
        name: &PrincipalName,
    ) -> Result<Option<Principal>, StoreError> {
        let exists = sqlx::query("SELECT 1 FROM pg_roles WHERE rolname = $1 AND rolcanlogin")
            .bind(name.as_str())
            .fetch_optional(&self.admin)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            r#"
            SELECT g.rolname
            FROM pg_auth_members m
            JOIN pg_roles g ON g.oid = m.roleid
            JOIN pg_roles u ON u.oid = m.member
            WHERE u.rolname = $1
            "#,
        )
        .bind(name.as_str())
        .fetch_all(&self.admin)
        .await?;

        let mut grants: Vec<RoleGrant> = rows
            .iter()
            .filter_map(|row| parse_group_role(row.get::<String, _>(0).as_str()))
            .collect();
        grants.sort();

        Ok(Some(Principal {
            name: name.clone(),
            grants,
        }))
    }

    async fn create_principal(&self, grant: &PrincipalGrant) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "CREATE ROLE {} LOGIN PASSWORD {}",
            quote_ident(grant.name.as_str()),
            quote_literal(&grant.secret)
        ))
        .execute(&self.admin)
        .await?;

        for role_grant in &grant.grants {
            self.apply_grant(&grant.name, role_grant).await?;
        }
        Ok(())
    }

    async fn apply_grant(
        &self,
        principal: &PrincipalName,
        grant: &RoleGrant,
    ) -> Result<(), StoreError> {
        self.check_grant_scope(grant)?;
        let group = self.ensure_group_role(grant).await?;
        sqlx::query(&format!(
            "GRANT {} TO {}",
            quote_ident(&group),
            quote_ident(principal.as_str())
        ))
        .execute(&self.admin)
        .await?;
        Ok(())
    }

    async fn revoke_grant(
        &self,
        principal: &PrincipalName,
        grant: &RoleGrant,
    ) -> Result<(), StoreError> {
        let group = group_role_name(&grant.database, grant.role);
        if !self.group_role_exists(&group).await? {
            return Ok(());
        }
        sqlx::query(&format!(
            "REVOKE {} FROM {}",
            quote_ident(&group),
            quote_ident(principal.as_str())
        ))
        .execute(&self.admin)
        .await?;
        Ok(())
    }

    async fn relation_exists(&self, relation: &str) -> Result<bool, StoreError> {
        let target = self.target_pool().await?;
        let row = sqlx::query(
            "SELECT 1 FROM information_schema.tables WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(relation)
        .fetch_optional(target)
        .await?;
        Ok(row.is_some())
    }

    async fn create_relation(&self, spec: &RelationSpec) -> Result<(), StoreError> {
        let target = self.target_pool().await?;
        let ddl = render_create_relation(spec);
        debug!("applying DDL: {}", ddl);
        sqlx::query(&ddl).execute(target).await?;
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool, StoreError> {
        let target = self.target_pool().await?;
        let row = sqlx::query(
            "SELECT 1 FROM pg_indexes WHERE schemaname = 'public' AND indexname = $1",
        )
        .bind(name)
        .fetch_optional(target)
        .await?;
        Ok(row.is_some())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        let target = self.target_pool().await?;
        let ddl = render_create_index(spec);
        debug!("applying DDL: {}", ddl);
        sqlx::query(&ddl).execute(target).await?;
        Ok(())
    }

    async fn row_count(&self, relation: &str) -> Result<u64, StoreError> {
        let target = self.target_pool().await?;
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) FROM {}",
            quote_ident(relation)
        ))
        .fetch_one(target)
        .await?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }

    async fn insert_rows(
        &self,
        relation: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let target = self.target_pool().await?;
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let statement = format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            quote_ident(relation)
        );

        let mut inserted = 0u64;
        let mut tx = target.begin().await?;
        for row in rows {
            let mut query = sqlx::query(&statement);
            for value in row {
                query = match value {
                    SqlValue::Text(s) => query.bind(s),
                    SqlValue::Int(i) => query.bind(i),
                    SqlValue::Numeric(d) => query.bind(d),
                    SqlValue::Date(d) => query.bind(d),
                };
            }
            let result = query.execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

/// Name of the group role carrying a (role, database) privilege set.
fn group_role_name(database: &DatabaseName, role: Role) -> String {
    format!("{}_{}", database.as_str(), role.as_str())
}

/// Recover a [`RoleGrant`] from a group role name; `None` for role names
/// outside this tool's vocabulary.
fn parse_group_role(name: &str) -> Option<RoleGrant> {
    let (prefix, role) = if let Some(prefix) = name.strip_suffix("_readwrite") {
        (prefix, Role::ReadWrite)
    } else if let Some(prefix) = name.strip_suffix("_readonly") {
        (prefix, Role::ReadOnly)
    } else {
        return None;
    };
    let database = DatabaseName::new(prefix).ok()?;
    Some(RoleGrant::new(role, database))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "INTEGER",
        ColumnType::BigInt => "BIGINT",
        ColumnType::Numeric => "NUMERIC",
        ColumnType::Date => "DATE",
    }
}

fn render_create_relation(spec: &RelationSpec) -> String {
    let columns = spec
        .columns
        .iter()
        .map(|column| {
            let mut definition = format!("{} {}", quote_ident(column.name), sql_type(column.ty));
            if column.primary_key {
                definition.push_str(" PRIMARY KEY");
            } else {
                definition.push_str(" NOT NULL");
            }
            if let Some(target) = column.references {
                definition.push_str(&format!(
                    " REFERENCES {} ({})",
                    quote_ident(target),
                    quote_ident(column.name)
                ));
            }
            definition
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns})",
        quote_ident(spec.name)
    )
}

fn render_create_index(spec: &IndexSpec) -> String {
    let unique = if spec.unique { "UNIQUE " } else { "" };
    let columns = spec
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE {unique}INDEX IF NOT EXISTS {} ON {} ({columns})",
        quote_ident(spec.name),
        quote_ident(spec.relation)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{analytics_indexes, analytics_relations};

    #[test]
    fn test_group_role_name_round_trip() {
        let db = DatabaseName::new("video_streaming").unwrap();
        let name = group_role_name(&db, Role::ReadWrite);
        assert_eq!(name, "video_streaming_readwrite");
        assert_eq!(
            parse_group_role(&name),
            Some(RoleGrant::new(Role::ReadWrite, db))
        );
    }

    #[test]
    fn test_parse_group_role_ignores_foreign_roles() {
        assert_eq!(parse_group_role("pg_monitor"), None);
        assert_eq!(parse_group_role("video_streaming"), None);
        assert_eq!(parse_group_role("_readwrite"), None);
    }

    #[test]
    fn test_quote_literal_escapes_quotes() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("o'neil"), "'o''neil'");
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("content"), "\"content\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_render_create_relation_content() {
        let relations = analytics_relations();
        let content = relations.iter().find(|r| r.name == "content").unwrap();
        let ddl = render_create_relation(content);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"content\""));
        assert!(ddl.contains("\"content_id\" TEXT PRIMARY KEY"));
        assert!(ddl.contains("\"rating\" NUMERIC NOT NULL"));
    }

    #[test]
    fn test_render_create_relation_with_reference() {
        let relations = analytics_relations();
        let details = relations.iter().find(|r| r.name == "movie_details").unwrap();
        let ddl = render_create_relation(details);
        assert!(ddl.contains("\"content_id\" TEXT PRIMARY KEY REFERENCES \"content\" (\"content_id\")"));
        assert!(ddl.contains("\"views_count\" BIGINT NOT NULL"));
    }

    #[test]
    fn test_render_create_index() {
        let indexes = analytics_indexes();
        let unique = indexes.iter().find(|i| i.name == "uq_content_genres").unwrap();
        assert_eq!(
            render_create_index(unique),
            "CREATE UNIQUE INDEX IF NOT EXISTS \"uq_content_genres\" ON \"content_genres\" (\"content_id\", \"genre\")"
        );

        let plain = indexes.iter().find(|i| i.name == "idx_content_rating").unwrap();
        assert_eq!(
            render_create_index(plain),
            "CREATE INDEX IF NOT EXISTS \"idx_content_rating\" ON \"content\" (\"rating\")"
        );
    }
}
