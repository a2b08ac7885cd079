//! Global concurrency gate for page fetches
//!
//! Every fetch task must hold a [`FetchPermit`] while its fetch runs. The
//! permit is returned to the pool when it is dropped, so a task that errors,
//! panics or is cancelled can never leak capacity.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate that caps the number of fetches in flight
#[derive(Debug, Clone)]
pub struct FetchGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Proof of holding one fetch slot; releases the slot on drop
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
}

impl FetchGate {
    /// Creates a gate with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until a slot is free and takes it
    ///
    /// Returns `None` only if the gate has been closed.
    pub async fn acquire(&self) -> Option<FetchPermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(FetchPermit { _permit: permit })
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Closes the gate; pending and future `acquire` calls return `None`
    pub fn close(&self) {
        self.semaphore.close();
    }
}
