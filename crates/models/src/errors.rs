use thiserror::Error;

/// Per-record validation failures, reported in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("the customer should have a valid first name")]
    InvalidFirstName,
    #[error("the customer should have a valid last name")]
    InvalidLastName,
    #[error("the customer should have more than 18 years (got {0})")]
    InvalidAge(i32),
}
