pub mod config;
pub mod domain;
pub mod error;
pub mod provision;
pub mod schema;
pub mod seed;
pub mod store;

pub use config::Config;
pub use domain::{
    DatabaseName, Principal, PrincipalGrant, PrincipalName, Role, RoleGrant,
};
pub use error::InitError;
pub use provision::{PrincipalOutcome, ProvisionReport, Provisioner};
pub use schema::{analytics_indexes, analytics_relations};
pub use store::{AdminStore, MemoryStore, PgStore, StoreError};
