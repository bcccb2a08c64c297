//! Domain types for the provisioner: validated names, principal grants,
//! and seed data shapes.

pub mod grant;
pub mod primitives;
pub mod records;

pub use grant::{Principal, PrincipalGrant, RoleGrant};
pub use primitives::{DatabaseName, InvalidName, PrincipalName, Role};
pub use records::{ContentCatalog, MovieDoc, SeriesDoc, SessionRecord, UserRecord};
