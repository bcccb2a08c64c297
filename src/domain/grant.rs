//! Principal grants: the (identifier, secret, role-set) entity the
//! provisioner ensures.

use super::{DatabaseName, PrincipalName, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single (role, database-scope) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: Role,
    pub database: DatabaseName,
}

impl RoleGrant {
    pub fn new(role: Role, database: DatabaseName) -> Self {
        RoleGrant { role, database }
    }
}

impl fmt::Display for RoleGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.role, self.database)
    }
}

/// The desired state of a principal: identifier, credential, and the exact
/// set of grants it should hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalGrant {
    pub name: PrincipalName,
    pub secret: String,
    pub grants: Vec<RoleGrant>,
}

impl PrincipalGrant {
    pub fn new(name: PrincipalName, secret: String, grants: Vec<RoleGrant>) -> Self {
        PrincipalGrant {
            name,
            secret,
            grants,
        }
    }
}

/// A principal as observed in the store (the credential is never read back).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: PrincipalName,
    pub grants: Vec<RoleGrant>,
}
