use models::errors::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no customers provided in the request")]
    EmptyBatch,
    #[error("invalid customer data at position {index} ({first_name} {last_name}): {reason}")]
    Rejected {
        index: usize,
        first_name: String,
        last_name: String,
        #[source]
        reason: ModelError,
    },
    #[error("customer id space exhausted at position {index} (requested id {id})")]
    IdSpaceExhausted { index: usize, id: i64 },
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("snapshot encode error: {0}")]
    Encode(String),
    #[error("snapshot io error: {0}")]
    Io(String),
}

impl ServiceError {
    pub fn io(path: &std::path::Path, e: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", path.display(), e))
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::EmptyBatch => 1001,
            ServiceError::Rejected { reason: ModelError::InvalidFirstName, .. } => 1002,
            ServiceError::Rejected { reason: ModelError::InvalidLastName, .. } => 1003,
            ServiceError::Rejected { reason: ModelError::InvalidAge(_), .. } => 1004,
            ServiceError::IdSpaceExhausted { .. } => 1005,
            ServiceError::MalformedSnapshot(_) => 1101,
            ServiceError::Encode(_) => 1102,
            ServiceError::Io(_) => 1200,
        }
    }

    /// Caller-input faults; everything else is a storage-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::EmptyBatch | ServiceError::Rejected { .. } | ServiceError::IdSpaceExhausted { .. }
        )
    }

    pub fn rejection(&self) -> Option<&ModelError> {
        match self {
            ServiceError::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
