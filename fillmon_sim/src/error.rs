use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("nominal unit weight must be finite and > 0, got {0}")]
    InvalidNominal(f64),
    #[error("initial tank inventory must be finite and >= 0, got {0}")]
    InvalidInventory(f64),
    #[error("tolerance ratio must be in (0, 0.5], got {0}")]
    InvalidTolerance(f64),
}

pub type Result<T> = std::result::Result<T, SimError>;
