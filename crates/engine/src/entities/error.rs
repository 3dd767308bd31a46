//! Quest engine errors.

use overman_domain::DomainError;

use crate::infrastructure::ports::RepoError;

/// Errors returned by every quest operation.
#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Insufficient funds: {needed} coins needed, {available} available")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("Quest is locked: {satisfied}/{required} prerequisites completed")]
    Locked { satisfied: u32, required: u32 },
    #[error("Friend has not completed all tasks yet")]
    PartnerIncomplete,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Repository error: {0}")]
    Repo(RepoError),
}

impl QuestError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<RepoError> for QuestError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            RepoError::ConstraintViolation(msg) => Self::AlreadyExists(msg),
            other => Self::Repo(other),
        }
    }
}

impl From<DomainError> for QuestError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(msg) | DomainError::Parse(msg) => Self::InvalidInput(msg),
            DomainError::Constraint(msg) | DomainError::InvalidStateTransition(msg) => {
                Self::InvariantViolation(msg)
            }
        }
    }
}
