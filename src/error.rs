use thiserror::Error;

use crate::case::BranchId;

/// Failures of the power-flow engine and the impedance conversions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// R = X = 0 on a branch: the two-port equations divide by R² + X².
    #[error("branch {branch} has zero impedance (R = X = 0)")]
    DegenerateBranch { branch: BranchId },

    /// Polar impedance given with a negative magnitude.
    #[error("impedance magnitude must be non-negative, got {magnitude}")]
    InvalidImpedance { magnitude: f64 },
}

/// Failures while reading a case file.
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown key '{key}'")]
    UnknownKey { line: usize, key: String },

    #[error("missing required field '{0}'")]
    Missing(String),

    #[error(transparent)]
    Flow(#[from] FlowError),
}
