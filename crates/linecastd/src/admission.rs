//! Admission control for incoming connections.
//!
//! A fixed pool of slots bounds the number of connections that are past
//! admission and not yet torn down, handshake window included. Acquiring
//! never waits: when the pool is empty the caller rejects the connection
//! on the spot so the accept loop stays responsive.
//!
//! A slot is released when its [`AdmissionSlot`] is dropped, which makes
//! "exactly once per successful acquisition" hold on every exit path of
//! the owning task, error and panic paths included.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::debug;

/// Bounded, non-blocking slot pool.
///
/// Cheap to clone; clones share the same pool.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionController {
    /// Creates a pool with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Takes a slot if one is free.
    ///
    /// Returns `None` immediately when all slots are held.
    pub fn try_acquire(&self) -> Option<AdmissionSlot> {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => Some(AdmissionSlot { _permit: permit }),
            Err(TryAcquireError::NoPermits) => None,
            Err(TryAcquireError::Closed) => {
                debug!("Admission pool closed");
                None
            }
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Slots currently held.
    pub fn held(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

/// One held admission slot. Dropping it returns the slot to the pool.
#[derive(Debug)]
#[must_use = "dropping the slot releases it immediately"]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionSlot {
    /// Returns the slot to the pool.
    pub fn release(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_until_full() {
        let admission = AdmissionController::new(2);

        let first = admission.try_acquire();
        let second = admission.try_acquire();
        let third = admission.try_acquire();

        assert!(first.is_some());
        assert!(second.is_some());
        assert!(third.is_none(), "third acquisition must fail at capacity 2");
        assert_eq!(admission.held(), 2);
        assert_eq!(admission.available(), 0);
    }

    #[test]
    fn test_release_returns_slot() {
        let admission = AdmissionController::new(1);

        let slot = admission.try_acquire().unwrap();
        assert!(admission.try_acquire().is_none());

        slot.release();
        assert_eq!(admission.available(), 1);
        assert!(admission.try_acquire().is_some());
    }

    #[test]
    fn test_drop_releases_exactly_once() {
        let admission = AdmissionController::new(3);
        {
            let _a = admission.try_acquire().unwrap();
            let _b = admission.try_acquire().unwrap();
            assert_eq!(admission.held(), 2);
        }
        assert_eq!(admission.held(), 0);
        assert_eq!(admission.available(), admission.capacity());
    }

    #[test]
    fn test_failed_acquire_does_not_release() {
        let admission = AdmissionController::new(1);
        let _slot = admission.try_acquire().unwrap();

        for _ in 0..5 {
            assert!(admission.try_acquire().is_none());
        }
        assert_eq!(admission.held(), 1);
    }

    #[test]
    fn test_clones_share_pool() {
        let admission = AdmissionController::new(1);
        let clone = admission.clone();

        let _slot = admission.try_acquire().unwrap();
        assert!(clone.try_acquire().is_none());
        assert_eq!(clone.held(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_acquire_release_conserves_slots() {
        let admission = AdmissionController::new(4);
        let mut tasks = Vec::new();

        for _ in 0..32 {
            let admission = admission.clone();
            tasks.push(tokio::spawn(async move {
                let mut admitted = 0;
                for _ in 0..50 {
                    if let Some(slot) = admission.try_acquire() {
                        assert!(admission.held() <= admission.capacity());
                        admitted += 1;
                        tokio::task::yield_now().await;
                        drop(slot);
                    }
                }
                admitted
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(admission.available(), 4);
    }
}
