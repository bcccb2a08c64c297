//! Domain primitives: DatabaseName, PrincipalName, Role.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a name fails identifier validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid identifier {name:?}: {reason}")]
pub struct InvalidName {
    pub name: String,
    pub reason: &'static str,
}

fn validate_identifier(name: &str) -> Result<(), InvalidName> {
    let mut chars = name.chars();
    match chars.next() {
        None => {
            return Err(InvalidName {
                name: name.to_string(),
                reason: "must not be empty",
            })
        }
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => {
            return Err(InvalidName {
                name: name.to_string(),
                reason: "must start with an ASCII letter or underscore",
            })
        }
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(InvalidName {
            name: name.to_string(),
            reason: "must contain only ASCII letters, digits, and underscores",
        });
    }
    if name.len() > 63 {
        return Err(InvalidName {
            name: name.to_string(),
            reason: "must be at most 63 bytes",
        });
    }
    Ok(())
}

/// Name of a database within the target store.
///
/// Validated at construction; names reach DDL statements, so anything that
/// is not a plain identifier is rejected before a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn new(name: &str) -> Result<Self, InvalidName> {
        validate_identifier(name)?;
        Ok(DatabaseName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatabaseName {
    type Error = InvalidName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DatabaseName::new(&value)
    }
}

impl From<DatabaseName> for String {
    fn from(value: DatabaseName) -> Self {
        value.0
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a principal (login role) within the target store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrincipalName(String);

impl PrincipalName {
    pub fn new(name: &str) -> Result<Self, InvalidName> {
        validate_identifier(name)?;
        Ok(PrincipalName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PrincipalName {
    type Error = InvalidName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PrincipalName::new(&value)
    }
}

impl From<PrincipalName> for String {
    fn from(value: PrincipalName) -> Self {
        value.0
    }
}

impl fmt::Display for PrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Privilege level a principal holds over a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read and write access to all relations in the database.
    ReadWrite,
    /// Read-only access.
    ReadOnly,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ReadWrite => "readwrite",
            Role::ReadOnly => "readonly",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "readwrite" => Some(Role::ReadWrite),
            "readonly" => Some(Role::ReadOnly),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
