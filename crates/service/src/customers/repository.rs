use async_trait::async_trait;
use models::Customer;

use super::store::{BatchOutcome, CustomerStore};
use crate::errors::ServiceError;

/// Trait abstraction over the customer record set, as consumed by the HTTP layer.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn list(&self) -> Vec<Customer>;
    async fn last_id(&self) -> i64;
    async fn add_batch(&self, candidates: Vec<Customer>) -> Result<BatchOutcome, ServiceError>;
    async fn count(&self) -> usize;
}

#[async_trait]
impl CustomerRepository for CustomerStore {
    async fn list(&self) -> Vec<Customer> { self.list().await }
    async fn last_id(&self) -> i64 { self.last_id().await }
    async fn add_batch(&self, candidates: Vec<Customer>) -> Result<BatchOutcome, ServiceError> { self.add_batch(candidates).await }
    async fn count(&self) -> usize { self.len().await }
}
