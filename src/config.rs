use crate::domain::{DatabaseName, PrincipalGrant, PrincipalName, Role, RoleGrant};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Explicit provisioner configuration.
///
/// The original deployment drove this from ambient script state; here every
/// input is a named field so the ensure logic can be constructed and tested
/// without touching the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Administrator credentials used to issue the provisioning requests.
    pub admin_user: String,
    pub admin_password: String,
    /// The database to provision.
    pub database: DatabaseName,
    /// The service principal to ensure.
    pub app_user: PrincipalName,
    pub app_password: String,
    pub app_role: Role,
    /// Content catalog to seed (JSON with `movies`/`series` arrays).
    pub seed_content_json: Option<PathBuf>,
    /// Directory holding `users.csv` and `viewing_sessions.csv` snapshots.
    pub seed_snapshot_dir: Option<PathBuf>,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = env_map
            .get("DB_HOST")
            .cloned()
            .unwrap_or_else(|| "localhost".to_string());

        let port = env_map
            .get("DB_PORT")
            .map(|s| s.as_str())
            .unwrap_or("5432")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("DB_PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let admin_user = env_map
            .get("DB_ADMIN_USER")
            .cloned()
            .unwrap_or_else(|| "postgres".to_string());

        let admin_password = env_map
            .get("DB_ADMIN_PASSWORD")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DB_ADMIN_PASSWORD".to_string()))?;

        let database = DatabaseName::new(
            env_map
                .get("APP_DB")
                .map(|s| s.as_str())
                .unwrap_or("video_streaming"),
        )
        .map_err(|e| ConfigError::InvalidValue("APP_DB".to_string(), e.reason.to_string()))?;

        let app_user = PrincipalName::new(
            env_map
                .get("APP_USER")
                .map(|s| s.as_str())
                .unwrap_or("video_user"),
        )
        .map_err(|e| ConfigError::InvalidValue("APP_USER".to_string(), e.reason.to_string()))?;

        let app_password = env_map
            .get("APP_PASSWORD")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("APP_PASSWORD".to_string()))?;

        let role_str = env_map
            .get("APP_ROLE")
            .map(|s| s.as_str())
            .unwrap_or("readwrite");
        let app_role = Role::parse(role_str).ok_or_else(|| {
            ConfigError::InvalidValue(
                "APP_ROLE".to_string(),
                format!("must be readwrite or readonly, got {}", role_str),
            )
        })?;

        let seed_content_json = env_map.get("SEED_CONTENT_JSON").map(PathBuf::from);
        let seed_snapshot_dir = env_map.get("SEED_SNAPSHOT_DIR").map(PathBuf::from);

        let connect_timeout_secs = env_map
            .get("CONNECT_TIMEOUT_SECS")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "CONNECT_TIMEOUT_SECS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            host,
            port,
            admin_user,
            admin_password,
            database,
            app_user,
            app_password,
            app_role,
            seed_content_json,
            seed_snapshot_dir,
            connect_timeout_secs,
        })
    }

    /// The exact grant set the service principal should hold.
    pub fn grant_set(&self) -> Vec<RoleGrant> {
        vec![RoleGrant::new(self.app_role, self.database.clone())]
    }

    /// The desired state of the service principal.
    pub fn principal_grant(&self) -> PrincipalGrant {
        PrincipalGrant::new(
            self.app_user.clone(),
            self.app_password.clone(),
            self.grant_set(),
        )
    }
}
