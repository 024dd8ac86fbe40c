use async_trait::async_trait;

use models::SequenceKey;

use super::errors::SequenceError;

/// Store abstraction over the per-key counter rows.
///
/// Every method is a single atomic operation against the backing store.
/// Implementations must never expand `increment` into a read-then-write
/// pair; the no-duplicate guarantee rests entirely on the store's native
/// read-modify-write primitive. Keys never interact: an operation on one
/// key neither blocks nor observes another.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key` by 1 and return the new value,
    /// creating the counter at 0 first (upsert) if it does not exist.
    async fn increment(&self, key: SequenceKey) -> Result<i64, SequenceError>;

    /// Decrement the counter for `key` by 1, floored at 0. Returns the
    /// value after the operation, or `None` when the counter was absent
    /// or already at 0 (a no-op, not an error).
    async fn decrement(&self, key: SequenceKey) -> Result<Option<i64>, SequenceError>;

    /// Read the current value without creating a row. 0 when unset.
    async fn current(&self, key: SequenceKey) -> Result<i64, SequenceError>;
}

/// In-memory counter store for tests, benches and doc examples
pub mod memory {
    use super::*;
    use dashmap::DashMap;

    /// Counter map keyed by `SequenceKey`. Entry operations hold the
    /// key's shard lock for their whole duration, so each increment and
    /// decrement is atomic with respect to concurrent callers.
    #[derive(Default)]
    pub struct MemoryCounterStore {
        counters: DashMap<SequenceKey, i64>,
    }

    #[async_trait]
    impl CounterStore for MemoryCounterStore {
        async fn increment(&self, key: SequenceKey) -> Result<i64, SequenceError> {
            let mut entry = self.counters.entry(key).or_insert(0);
            *entry += 1;
            Ok(*entry)
        }

        async fn decrement(&self, key: SequenceKey) -> Result<Option<i64>, SequenceError> {
            match self.counters.get_mut(&key) {
                Some(mut entry) if *entry > 0 => {
                    *entry -= 1;
                    Ok(Some(*entry))
                }
                _ => Ok(None),
            }
        }

        async fn current(&self, key: SequenceKey) -> Result<i64, SequenceError> {
            Ok(self.counters.get(&key).map(|v| *v).unwrap_or(0))
        }
    }
}
