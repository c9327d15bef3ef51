//! Service layer owning the customer record set.
//! - `storage::snapshot` converts records to and from the snapshot file.
//! - `customers::store` is the single mutator of the in-memory sequence.
//! - `customers::repository` is the seam the HTTP layer consumes.

pub mod errors;
pub mod storage;
pub mod customers;

pub use customers::repository::CustomerRepository;
pub use customers::store::{BatchOutcome, CustomerStore, IdReassignment};
pub use errors::ServiceError;
