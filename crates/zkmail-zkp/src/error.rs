//! # Proving and Verification Errors
//!
//! A constraint violation is an expected outcome: the inputs do not satisfy
//! the circuit. Every other proving failure is infrastructural. Callers
//! branch on [`ProvingError::kind`] rather than matching variants.

use thiserror::Error;

use crate::backend::BackendId;

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The inputs fail one of the circuit's declared equalities.
    ConstraintViolation,
    /// The deadline elapsed before the operation finished.
    Cancelled,
    /// Anything else: missing backend, bad circuit, missing input, engine fault.
    Infrastructure,
}

/// Proof generation failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvingError {
    /// The inputs do not satisfy the named constraint.
    #[error("constraint `{constraint}` not satisfied: {detail}")]
    ConstraintViolation { constraint: String, detail: String },

    /// The backend was not selected when the prover was created.
    #[error("backend {0} was not prepared for this prover")]
    BackendNotPrepared(BackendId),

    /// The circuit artifact cannot be used by the engine.
    #[error("malformed circuit: {0}")]
    MalformedCircuit(String),

    /// A declared circuit input is absent from the record.
    #[error("missing circuit input `{0}`")]
    MissingInput(String),

    /// The record carries an input the circuit does not declare.
    #[error("unexpected circuit input `{0}`")]
    UnexpectedInput(String),

    /// One-time backend setup failed.
    #[error("setup failed for backend {backend}: {reason}")]
    Setup { backend: BackendId, reason: String },

    /// The deadline elapsed.
    #[error("proving cancelled after {0:?}")]
    Cancelled(std::time::Duration),

    /// The engine failed for a reason unrelated to the inputs.
    #[error("proving engine failure: {0}")]
    Engine(String),
}

impl ProvingError {
    /// Classify this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConstraintViolation { .. } => FailureKind::ConstraintViolation,
            Self::Cancelled(_) => FailureKind::Cancelled,
            _ => FailureKind::Infrastructure,
        }
    }

    /// Returns true for an expected, input-driven failure.
    pub fn is_constraint_violation(&self) -> bool {
        self.kind() == FailureKind::ConstraintViolation
    }

    pub(crate) fn constraint(constraint: &str, detail: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            constraint: constraint.to_string(),
            detail: detail.into(),
        }
    }
}

/// Verification could not run. A proof that simply does not verify is
/// `Ok(false)`, not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The proof object is not structurally valid.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// The proof was produced by a different backend.
    #[error("proof was produced by {actual}, not {expected}")]
    BackendMismatch { expected: BackendId, actual: BackendId },

    /// The backend was not selected when the prover was created.
    #[error("backend {0} was not prepared for this prover")]
    BackendNotPrepared(BackendId),

    /// Setup failed while preparing the backend for verification.
    #[error("setup failed: {0}")]
    Setup(String),

    /// The deadline elapsed.
    #[error("verification cancelled after {0:?}")]
    Cancelled(std::time::Duration),

    /// The engine failed.
    #[error("verification engine failure: {0}")]
    Engine(String),
}

impl VerificationError {
    /// Classify this failure. Verification has no constraint-violation kind.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Cancelled(_) => FailureKind::Cancelled,
            _ => FailureKind::Infrastructure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn kinds() {
        assert!(ProvingError::constraint("to_hash", "mismatch").is_constraint_violation());
        assert_eq!(
            ProvingError::BackendNotPrepared(BackendId::Plonk).kind(),
            FailureKind::Infrastructure
        );
        assert_eq!(
            ProvingError::Cancelled(Duration::from_millis(5)).kind(),
            FailureKind::Cancelled
        );
        assert_eq!(
            VerificationError::Cancelled(Duration::ZERO).kind(),
            FailureKind::Cancelled
        );
        assert_eq!(
            VerificationError::MalformedProof("x".into()).kind(),
            FailureKind::Infrastructure
        );
    }

    #[test]
    fn display() {
        let err = ProvingError::constraint("username_hash", "digest differs");
        assert_eq!(
            err.to_string(),
            "constraint `username_hash` not satisfied: digest differs"
        );
        assert_eq!(
            ProvingError::BackendNotPrepared(BackendId::Honk).to_string(),
            "backend honk was not prepared for this prover"
        );
    }
}
