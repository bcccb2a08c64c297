//! CSV snapshot loading for the users and viewing_sessions relations.

use super::{SeedBatch, SeedError};
use crate::domain::{SessionRecord, UserRecord};
use crate::store::SqlValue;
use std::path::Path;

pub const USERS_FILE: &str = "users.csv";
pub const SESSIONS_FILE: &str = "viewing_sessions.csv";

pub const USER_COLUMNS: &[&str] = &[
    "user_id",
    "age",
    "country",
    "subscription_type",
    "registration_date",
    "total_watch_time_hours",
];
pub const SESSION_COLUMNS: &[&str] = &[
    "session_id",
    "user_id",
    "content_id",
    "watch_date",
    "watch_duration_minutes",
    "completion_percentage",
    "device_type",
    "quality_level",
];

/// Load the users snapshot into a row batch.
pub fn load_users(path: &Path) -> Result<SeedBatch, SeedError> {
    let records: Vec<UserRecord> = read_csv(path)?;
    let rows = records
        .into_iter()
        .map(|user| {
            vec![
                SqlValue::Int(user.user_id),
                SqlValue::Int(i64::from(user.age)),
                SqlValue::Text(user.country),
                SqlValue::Text(user.subscription_type),
                SqlValue::Date(user.registration_date),
                SqlValue::Numeric(user.total_watch_time_hours),
            ]
        })
        .collect();
    Ok(SeedBatch {
        relation: "users",
        columns: USER_COLUMNS,
        rows,
    })
}

/// Load the viewing sessions snapshot into a row batch.
pub fn load_sessions(path: &Path) -> Result<SeedBatch, SeedError> {
    let records: Vec<SessionRecord> = read_csv(path)?;
    let rows = records
        .into_iter()
        .map(|session| {
            vec![
                SqlValue::Text(session.session_id),
                SqlValue::Int(session.user_id),
                SqlValue::Text(session.content_id),
                SqlValue::Date(session.watch_date),
                SqlValue::Int(i64::from(session.watch_duration_minutes)),
                SqlValue::Numeric(session.completion_percentage),
                SqlValue::Text(session.device_type),
                SqlValue::Text(session.quality_level),
            ]
        })
        .collect();
    Ok(SeedBatch {
        relation: "viewing_sessions",
        columns: SESSION_COLUMNS,
        rows,
    })
}

/// Read a headered CSV file into typed records. Any malformed row fails the
/// whole file, so a partially-valid snapshot never half-loads.
fn read_csv<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, SeedError> {
    if !path.exists() {
        return Err(SeedError::Missing(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path).map_err(|source| SeedError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| SeedError::Csv {
            path: path.to_path_buf(),
            source,
        })
}
