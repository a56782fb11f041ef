//! Bounded pool of isolate box identifiers
//!
//! The pool is the sole owner of box-id state: an id is either free or
//! held by exactly one in-flight execution. `acquire` suspends callers
//! when every id is taken (back-pressure, not failure) and wakes them in
//! FIFO order as ids come back.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tracing::debug;

use crate::isolate::IsolateError;

/// Non-blocking snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of ids in the configured range
    pub total: usize,
    /// Ids currently held by executions
    pub in_use: usize,
    /// Ids available to hand out
    pub free: usize,
}

#[derive(Debug)]
struct PoolState {
    free: VecDeque<u32>,
    in_use: HashSet<u32>,
}

#[derive(Debug)]
struct PoolInner {
    min_id: u32,
    max_id: u32,
    /// Fair semaphore: waiters resume in FIFO order
    semaphore: Semaphore,
    state: Mutex<PoolState>,
}

impl PoolInner {
    /// Return an id to the free set. Releasing an id that is not
    /// currently held is a no-op.
    fn release(&self, id: u32) {
        let mut state = self.state.lock().expect("pool state lock poisoned");
        if state.in_use.remove(&id) {
            state.free.push_back(id);
            drop(state);
            self.semaphore.add_permits(1);
            debug!(id, "released box id to pool");
        }
    }
}

/// Pool of box identifiers `[min_id, max_id]`
#[derive(Debug, Clone)]
pub struct BoxPool {
    inner: Arc<PoolInner>,
}

impl BoxPool {
    /// Create a pool over the inclusive id range `[min_id, max_id]`
    pub fn new(min_id: u32, max_id: u32) -> Self {
        assert!(min_id <= max_id, "box id range is empty");
        let free: VecDeque<u32> = (min_id..=max_id).collect();
        let total = free.len();

        Self {
            inner: Arc::new(PoolInner {
                min_id,
                max_id,
                semaphore: Semaphore::new(total),
                state: Mutex::new(PoolState {
                    free,
                    in_use: HashSet::with_capacity(total),
                }),
            }),
        }
    }

    /// Acquire a free box id, suspending until one is available.
    ///
    /// The returned lease gives the id back to the pool on drop.
    pub async fn acquire(&self) -> Result<BoxLease, IsolateError> {
        let permit = self
            .inner
            .semaphore
            .acquire()
            .await
            .map_err(|_| IsolateError::PoolClosed)?;
        // The permit is accounted for by the id we now hold; releases
        // re-add permits explicitly.
        permit.forget();

        let id = {
            let mut state = self.inner.state.lock().expect("pool state lock poisoned");
            let id = state
                .free
                .pop_front()
                .expect("semaphore permit guarantees a free id");
            state.in_use.insert(id);
            id
        };

        debug!(id, "acquired box id from pool");
        Ok(BoxLease {
            id,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Return an id to the pool. Called automatically when a lease drops;
    /// releasing an id that is not currently held is a no-op.
    pub fn release(&self, id: u32) {
        self.inner.release(id);
    }

    /// Non-blocking occupancy snapshot
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock().expect("pool state lock poisoned");
        PoolStats {
            total: (self.inner.max_id - self.inner.min_id + 1) as usize,
            in_use: state.in_use.len(),
            free: state.free.len(),
        }
    }

    /// Lowest id handed out by this pool
    pub fn min_id(&self) -> u32 {
        self.inner.min_id
    }

    /// Highest id handed out by this pool
    pub fn max_id(&self) -> u32 {
        self.inner.max_id
    }

    /// Number of ids in the pool
    pub fn capacity(&self) -> usize {
        (self.inner.max_id - self.inner.min_id + 1) as usize
    }
}

/// Exclusive hold on one box id for the duration of one execution
#[derive(Debug)]
pub struct BoxLease {
    id: u32,
    inner: Arc<PoolInner>,
}

impl BoxLease {
    /// The held box id
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for BoxLease {
    fn drop(&mut self) {
        self.inner.release(self.id);
    }
}
