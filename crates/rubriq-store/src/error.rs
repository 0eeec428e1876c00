use thiserror::Error;

use rubriq_core::error::RubriqError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Rubric(#[from] RubriqError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
