//! Synthetic workloads over a shared in-memory keyed store

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use loadcell::{WorkResult, Workload, WorkloadError};

/// Concurrent filler tasks used during population
const POPULATE_TASKS: usize = 32;

/// Shared in-memory keyed store standing in for the system under test
pub type Store = Arc<RwLock<HashMap<u64, Vec<u8>>>>;

/// Create an empty store
pub fn new_store() -> Store {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Fill the store with `key_count` random values of `value_size` bytes
///
/// Fans out across a fixed set of filler tasks that claim keys from a
/// shared counter until the range is exhausted.
pub async fn populate(store: Store, key_count: u64, value_size: usize) {
    let next_key = Arc::new(AtomicU64::new(0));

    let fillers: Vec<_> = (0..POPULATE_TASKS)
        .map(|_| {
            let store = Arc::clone(&store);
            let next_key = Arc::clone(&next_key);
            tokio::spawn(async move {
                let mut rng = StdRng::from_entropy();
                loop {
                    let key = next_key.fetch_add(1, Ordering::Relaxed);
                    if key >= key_count {
                        break;
                    }
                    let mut value = vec![0u8; value_size];
                    rng.fill(&mut value[..]);
                    store.write().insert(key, value);
                }
            })
        })
        .collect();

    futures::future::join_all(fillers).await;
}

/// Reads one random key per invocation
pub struct ReadWorkload {
    store: Store,
    key_count: u64,
}

impl ReadWorkload {
    pub fn new(store: Store, key_count: u64) -> Self {
        Self { store, key_count }
    }
}

#[async_trait]
impl Workload for ReadWorkload {
    async fn invoke(&self, _worker_id: usize, rng: &mut StdRng) -> WorkResult {
        let key = rng.gen_range(0..self.key_count);
        match self.store.read().get(&key) {
            Some(_) => Ok(1),
            None => Err(WorkloadError::transient(format!("key {key} not found"))),
        }
    }
}

/// Writes a batch of random keyed values per invocation
pub struct WriteWorkload {
    store: Store,
    key_count: u64,
    value_size: usize,
    batch_size: u64,
}

impl WriteWorkload {
    pub fn new(store: Store, key_count: u64, value_size: usize, batch_size: u64) -> Self {
        Self {
            store,
            key_count,
            value_size,
            batch_size,
        }
    }
}

#[async_trait]
impl Workload for WriteWorkload {
    async fn invoke(&self, _worker_id: usize, rng: &mut StdRng) -> WorkResult {
        // Generate outside the write lock.
        let mut batch = Vec::with_capacity(self.batch_size as usize);
        for _ in 0..self.batch_size {
            let key = rng.gen_range(0..self.key_count);
            let mut value = vec![0u8; self.value_size];
            rng.fill(&mut value[..]);
            batch.push((key, value));
        }

        let mut store = self.store.write();
        for (key, value) in batch {
            store.insert(key, value);
        }
        Ok(self.batch_size)
    }
}

/// Error message a rate-limiting dependency would surface
///
/// Deliberately an opaque transient error rather than an explicit throttle
/// signal; the CLI maps it to a cool-down with a throttle classifier, the
/// way an embedding handles an SDK it cannot change.
pub const RATE_LIMIT_MESSAGE: &str = "request rate too large";

/// Succeeds after a fixed delay, injecting faults and rate-limit errors
pub struct FlakyWorkload {
    delay: Duration,
    fail_rate: f64,
    throttle_rate: f64,
}

impl FlakyWorkload {
    pub fn new(delay: Duration, fail_rate: f64, throttle_rate: f64) -> Self {
        Self {
            delay,
            fail_rate,
            throttle_rate,
        }
    }
}

#[async_trait]
impl Workload for FlakyWorkload {
    async fn invoke(&self, _worker_id: usize, rng: &mut StdRng) -> WorkResult {
        if self.throttle_rate > 0.0 && rng.gen_bool(self.throttle_rate) {
            return Err(WorkloadError::transient(RATE_LIMIT_MESSAGE));
        }
        if self.fail_rate > 0.0 && rng.gen_bool(self.fail_rate) {
            return Err(WorkloadError::transient("injected fault"));
        }
        tokio::time::sleep(self.delay).await;
        Ok(1)
    }
}
