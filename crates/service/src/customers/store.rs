use std::{cmp::Ordering, path::Path};

use models::Customer;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::errors::ServiceError;
use crate::storage::snapshot;

/// Returned by `last_id` when the store holds no records.
pub const EMPTY_LAST_ID: i64 = 1;

/// An id collision that was repaired while adding a batch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdReassignment {
    /// Position of the candidate within its batch.
    pub index: usize,
    pub from: i64,
    pub to: i64,
}

/// Result of a committed batch.
#[derive(Clone, Debug, Serialize, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub added: usize,
    pub reassigned: Vec<IdReassignment>,
}

/// In-memory customer store, ordered by `(last_name, first_name)` case-insensitively.
///
/// The sequence is only ever mutated by `add_batch` and the startup load. Each
/// batch is applied to a staged copy under the write lock and swapped in once
/// every candidate succeeded, so readers see the state before or after a batch
/// and never a partial one. No I/O happens while the lock is held.
#[derive(Default)]
pub struct CustomerStore {
    inner: RwLock<Vec<Customer>>,
}

impl CustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from arbitrary records, placing each one in turn.
    pub fn with_records(records: Vec<Customer>) -> Self {
        Self { inner: RwLock::new(place_all(records)) }
    }

    /// Copy of the current sequence.
    pub async fn list(&self) -> Vec<Customer> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Highest id in the store, or `1` when empty. Independent of sequence order.
    pub async fn last_id(&self) -> i64 {
        max_id(&self.inner.read().await).unwrap_or(EMPTY_LAST_ID)
    }

    /// Validate and insert `candidates` in order, all or nothing.
    ///
    /// A candidate whose id already exists (including ids placed earlier in the
    /// same batch) gets `max id + 1` instead of being rejected.
    pub async fn add_batch(&self, candidates: Vec<Customer>) -> Result<BatchOutcome, ServiceError> {
        if candidates.is_empty() {
            return Err(ServiceError::EmptyBatch);
        }

        let mut guard = self.inner.write().await;
        let mut staged = guard.clone();
        let mut top = max_id(&staged);
        let mut outcome = BatchOutcome { added: candidates.len(), reassigned: Vec::new() };

        for (index, mut candidate) in candidates.into_iter().enumerate() {
            if let Err(reason) = candidate.validate() {
                warn!(index, name = %candidate.full_name(), %reason, "customer batch rejected");
                return Err(ServiceError::Rejected {
                    index,
                    first_name: candidate.first_name,
                    last_name: candidate.last_name,
                    reason,
                });
            }

            if staged.iter().any(|c| c.id == candidate.id) {
                // a collision implies the staged set is non-empty
                let current = top.unwrap_or(candidate.id);
                let next = current
                    .checked_add(1)
                    .ok_or(ServiceError::IdSpaceExhausted { index, id: candidate.id })?;
                outcome.reassigned.push(IdReassignment { index, from: candidate.id, to: next });
                candidate.id = next;
            }

            top = Some(top.map_or(candidate.id, |t| t.max(candidate.id)));
            let at = insertion_index(&staged, &candidate);
            staged.insert(at, candidate);
        }

        *guard = staged;
        let total = guard.len();
        drop(guard);

        for r in &outcome.reassigned {
            warn!(index = r.index, from = r.from, to = r.to, "customer id already present; reassigned");
        }
        info!(added = outcome.added, total, "customer batch committed");
        Ok(outcome)
    }

    /// Replace the state with the snapshot at `path`.
    ///
    /// On failure the store is left empty and the error is returned for the
    /// host to report; serving can continue either way. A malformed file is
    /// renamed to `<path>.corrupt` first, so the shutdown save cannot replace
    /// it with the empty state.
    pub async fn load_from_snapshot(&self, path: impl AsRef<Path>) -> Result<usize, ServiceError> {
        let path = path.as_ref();
        match snapshot::load_file(path).await {
            Ok(records) => {
                let placed = place_all(records);
                let count = placed.len();
                *self.inner.write().await = placed;
                info!(path = %path.display(), count, "customer snapshot loaded");
                Ok(count)
            }
            Err(e) => {
                self.inner.write().await.clear();
                error!(path = %path.display(), error = %e, "customer snapshot load failed; starting empty");
                if matches!(e, ServiceError::MalformedSnapshot(_)) {
                    match snapshot::quarantine_file(path).await {
                        Ok(moved) => warn!(path = %path.display(), moved_to = %moved.display(), "malformed snapshot moved aside"),
                        Err(q) => error!(path = %path.display(), error = %q, "could not move malformed snapshot aside"),
                    }
                }
                Err(e)
            }
        }
    }

    /// Write the current state to `path`. Failures are logged and returned.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<usize, ServiceError> {
        let path = path.as_ref();
        let records = self.list().await;
        match snapshot::save_file(path, &records).await {
            Ok(()) => {
                info!(path = %path.display(), count = records.len(), "customer snapshot saved");
                Ok(records.len())
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "customer snapshot save failed");
                Err(e)
            }
        }
    }
}

fn max_id(records: &[Customer]) -> Option<i64> {
    records.iter().map(|c| c.id).max()
}

/// First position whose element sorts strictly after `candidate`; `len` if none.
/// Equal keys therefore keep insertion order.
fn insertion_index(records: &[Customer], candidate: &Customer) -> usize {
    records.partition_point(|c| c.cmp_by_name(candidate) != Ordering::Greater)
}

fn place_all(records: Vec<Customer>) -> Vec<Customer> {
    let mut placed = Vec::with_capacity(records.len());
    for record in records {
        let at = insertion_index(&placed, &record);
        placed.insert(at, record);
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::ModelError;
    use std::sync::Arc;

    fn c(first: &str, last: &str, age: i32, id: i64) -> Customer {
        Customer::new(first, last, age, id)
    }

    fn assert_sorted(records: &[Customer]) {
        for pair in records.windows(2) {
            assert_ne!(
                pair[0].cmp_by_name(&pair[1]),
                Ordering::Greater,
                "{:?} sorted after {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[tokio::test]
    async fn empty_store_last_id_is_one() {
        let store = CustomerStore::new();
        assert_eq!(store.last_id().await, 1);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn same_last_name_orders_by_first_and_repairs_id() -> anyhow::Result<()> {
        let store = CustomerStore::new();
        let outcome = store
            .add_batch(vec![c("Bob", "Jones", 30, 5), c("Amy", "Jones", 40, 5)])
            .await?;

        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.reassigned, vec![IdReassignment { index: 1, from: 5, to: 6 }]);
        assert_eq!(store.list().await, vec![c("Amy", "Jones", 40, 6), c("Bob", "Jones", 30, 5)]);
        assert_eq!(store.last_id().await, 6);
        Ok(())
    }

    #[tokio::test]
    async fn collision_uses_max_id_and_leaves_original_untouched() -> anyhow::Result<()> {
        let store = CustomerStore::with_records(vec![c("John", "Doe", 30, 1), c("Alice", "Smith", 25, 9)]);
        store.add_batch(vec![c("Eve", "Brown", 50, 1)]).await?;

        let list = store.list().await;
        assert_eq!(list[0], c("Eve", "Brown", 50, 10));
        assert!(list.contains(&c("John", "Doe", 30, 1)));
        Ok(())
    }

    #[tokio::test]
    async fn last_id_is_max_not_most_recent() -> anyhow::Result<()> {
        let store = CustomerStore::new();
        store.add_batch(vec![c("A", "Zed", 30, 40)]).await?;
        store.add_batch(vec![c("B", "Abe", 30, 3)]).await?;
        assert_eq!(store.last_id().await, 40);
        Ok(())
    }

    #[tokio::test]
    async fn empty_batch_rejected() {
        let store = CustomerStore::new();
        assert!(matches!(store.add_batch(vec![]).await, Err(ServiceError::EmptyBatch)));
    }

    #[tokio::test]
    async fn blank_first_name_rejected_store_unchanged() {
        let store = CustomerStore::new();
        let err = store.add_batch(vec![c("", "Smith", 30, 1)]).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&ModelError::InvalidFirstName));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn invalid_candidate_aborts_whole_batch() -> anyhow::Result<()> {
        let store = CustomerStore::with_records(vec![c("John", "Doe", 30, 1)]);
        let batch = vec![
            c("Amy", "Jones", 30, 2),
            c("Bob", "Jones", 31, 3),
            c("Cal", "Brown", 12, 4),
            c("Dee", "Smith", 44, 5),
            c("Eve", "White", 45, 6),
        ];
        match store.add_batch(batch).await {
            Err(e @ ServiceError::Rejected { .. }) => {
                assert_eq!(e.to_string(), "invalid customer data at position 2 (Cal Brown): the customer should have more than 18 years (got 12)");
                let ServiceError::Rejected { index, first_name, last_name, reason } = e else { unreachable!() };
                assert_eq!(index, 2);
                assert_eq!((first_name.as_str(), last_name.as_str()), ("Cal", "Brown"));
                assert_eq!(reason, ModelError::InvalidAge(12));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.list().await, vec![c("John", "Doe", 30, 1)]);
        Ok(())
    }

    #[tokio::test]
    async fn validation_order_is_first_last_age() {
        let store = CustomerStore::new();
        let err = store.add_batch(vec![c("Ann", "  ", 5, 1)]).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&ModelError::InvalidLastName));
        assert_eq!(err.code(), 1003);
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn ties_keep_insertion_order_case_insensitively() -> anyhow::Result<()> {
        let store = CustomerStore::new();
        store
            .add_batch(vec![c("amy", "jones", 30, 1), c("AMY", "JONES", 31, 2), c("Amy", "Jones", 32, 3)])
            .await?;
        let ids: Vec<i64> = store.list().await.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn id_overflow_aborts_batch() {
        let store = CustomerStore::with_records(vec![c("Max", "Id", 30, i64::MAX)]);
        let err = store.add_batch(vec![c("Amy", "Jones", 30, i64::MAX)]).await.unwrap_err();
        assert!(matches!(err, ServiceError::IdSpaceExhausted { index: 0, .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_batches_keep_order_and_unique_ids() -> anyhow::Result<()> {
        let store = Arc::new(CustomerStore::new());
        let firsts = ["John", "alice", "Bob", "eve", "Charlie", "David"];
        let lasts = ["Smith", "johnson", "Doe", "WILLIAMS", "Brown", "jones"];

        let mut handles = Vec::new();
        for t in 0..8usize {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for round in 0..10usize {
                    let batch = (0..5usize)
                        .map(|k| {
                            let n = t * 31 + round * 7 + k;
                            c(firsts[n % firsts.len()], lasts[(n / 3) % lasts.len()], 19 + (n % 60) as i32, 1)
                        })
                        .collect();
                    store.add_batch(batch).await.expect("valid batch");
                    let seen = store.list().await;
                    assert_eq!(seen.len() % 5, 0, "observed a partial batch");
                }
            }));
        }
        for h in handles {
            h.await?;
        }

        let list = store.list().await;
        assert_eq!(list.len(), 8 * 10 * 5);
        assert_sorted(&list);
        let mut ids: Vec<i64> = list.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), list.len());
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_survives_restart() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("customers.json");

        let before = CustomerStore::new();
        before.add_batch(vec![c("John", "Doe", 30, 1), c("Alice", "Smith", 25, 2)]).await?;
        assert_eq!(before.save_snapshot(&path).await?, 2);

        let after = CustomerStore::new();
        assert_eq!(after.load_from_snapshot(&path).await?, 2);
        assert_eq!(after.list().await, before.list().await);
        Ok(())
    }

    #[tokio::test]
    async fn load_places_unsorted_records() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("customers.json");
        tokio::fs::write(
            &path,
            br#"[{"firstName":"Zoe","lastName":"Young","age":40,"id":3},
                 {"firstName":"Amy","lastName":"adams","age":22,"id":3}]"#,
        )
        .await?;

        let store = CustomerStore::new();
        store.load_from_snapshot(&path).await?;
        let list = store.list().await;
        assert_eq!(list[0].first_name, "Amy");
        // duplicates from disk are tolerated as-is
        assert_eq!(list[1].id, 3);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_snapshot_starts_empty_and_reports() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("customers.json");
        tokio::fs::write(&path, b"{\"not\":\"an array\"}").await?;

        let store = CustomerStore::with_records(vec![c("John", "Doe", 30, 1)]);
        let err = store.load_from_snapshot(&path).await.unwrap_err();
        assert!(matches!(err, ServiceError::MalformedSnapshot(_)));
        assert!(store.is_empty().await);

        store.add_batch(vec![c("Amy", "Jones", 30, 1)]).await?;
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_snapshot_bytes_survive_load_save_cycle() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("customers.json");
        let corrupt: &[u8] = br#"[{"firstName":"John","lastName":"Doe","age":30,"id":1},]"#;
        tokio::fs::write(&path, corrupt).await?;

        let store = CustomerStore::new();
        assert!(matches!(
            store.load_from_snapshot(&path).await,
            Err(ServiceError::MalformedSnapshot(_))
        ));
        store.save_snapshot(&path).await?;

        let moved = dir.path().join("customers.json.corrupt");
        assert_eq!(tokio::fs::read(&moved).await?, corrupt);
        assert_eq!(snapshot::load_file(&path).await?, Vec::<Customer>::new());
        Ok(())
    }

    #[tokio::test]
    async fn save_failure_is_reported_not_fatal() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("file");
        tokio::fs::write(&blocker, b"x").await?;

        let store = CustomerStore::with_records(vec![c("John", "Doe", 30, 1)]);
        assert!(matches!(
            store.save_snapshot(blocker.join("customers.json")).await,
            Err(ServiceError::Io(_))
        ));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[test]
    fn insertion_index_finds_first_greater() {
        let records = vec![c("Amy", "Doe", 30, 1), c("Bob", "Doe", 30, 2), c("Al", "Smith", 30, 3)];
        assert_eq!(insertion_index(&records, &c("Ann", "doe", 30, 9)), 1);
        assert_eq!(insertion_index(&records, &c("Bob", "DOE", 30, 9)), 2);
        assert_eq!(insertion_index(&records, &c("Zed", "Zulu", 30, 9)), 3);
        assert_eq!(insertion_index(&records, &c("Zed", "Adams", 30, 9)), 0);
    }
}
