use crate::config::ConfigError;
use crate::provision::ProvisionError;
use crate::store::StoreError;
use thiserror::Error;

/// Top-level error for the provisioner binary.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),
}
