//! Space accounting.
//!
//! Reservations are advisory bookkeeping. An unbounded disk (the default)
//! accepts every reservation; a disk with a configured capacity refuses a
//! reservation that would exceed what is left unreserved.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::disk::{DiskError, DiskResult, Reservation};

/// Total space reported by an unbounded disk.
pub const UNBOUNDED_SPACE: u64 = u64::MAX;

/// Capacity limits plus the running total of reserved bytes.
#[derive(Debug)]
pub(crate) struct SpaceAccounting {
    capacity: Option<u64>,
    keep_free: u64,
    reserved: AtomicU64,
}

impl SpaceAccounting {
    pub(crate) fn new(capacity: Option<u64>, keep_free: u64) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            keep_free,
            reserved: AtomicU64::new(0),
        })
    }

    pub(crate) fn total(&self) -> u64 {
        self.capacity.unwrap_or(UNBOUNDED_SPACE)
    }

    pub(crate) fn available(&self, used: u64) -> u64 {
        self.total()
            .saturating_sub(used)
            .saturating_sub(self.keep_free)
    }

    pub(crate) fn reserved(&self) -> u64 {
        self.reserved.load(Ordering::Acquire)
    }

    pub(crate) fn unreserved(&self, used: u64) -> u64 {
        self.available(used).saturating_sub(self.reserved())
    }

    /// Add `bytes` to the reserved total. On a bounded disk the claim is
    /// refused when it does not fit into `available` minus what is already
    /// reserved; the check and the update are one atomic step.
    fn claim(&self, bytes: u64, available: u64) -> DiskResult<()> {
        let bounded = self.capacity.is_some();
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let unreserved = available.saturating_sub(current);
                (!bounded || bytes <= unreserved).then(|| current.saturating_add(bytes))
            })
            .map(|_| ())
            .map_err(|current| {
                let unreserved = available.saturating_sub(current);
                tracing::warn!(
                    requested = bytes,
                    available = unreserved,
                    "reservation refused"
                );
                DiskError::NoSpace {
                    requested: bytes,
                    available: unreserved,
                }
            })
    }

    /// Subtract `bytes` from the reserved total, stopping at zero.
    fn release(&self, bytes: u64) {
        let mut current = self.reserved.load(Ordering::Acquire);
        loop {
            let next = current.saturating_sub(bytes);
            match self.reserved.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Reservation handle of a memory disk. Released on drop.
pub struct MemoryReservation {
    space: Arc<SpaceAccounting>,
    used: Arc<dyn Fn() -> u64 + Send + Sync>,
    size: u64,
}

impl MemoryReservation {
    /// Claim `bytes` against `space`. `used` reports current content bytes.
    pub(crate) fn acquire(
        space: Arc<SpaceAccounting>,
        used: Arc<dyn Fn() -> u64 + Send + Sync>,
        bytes: u64,
    ) -> DiskResult<Self> {
        space.claim(bytes, space.available(used()))?;
        Ok(Self {
            space,
            used,
            size: bytes,
        })
    }
}

impl std::fmt::Debug for MemoryReservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryReservation")
            .field("size", &self.size)
            .finish()
    }
}

impl Reservation for MemoryReservation {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&mut self, new_size: u64) -> DiskResult<()> {
        if new_size > self.size {
            let grow = new_size - self.size;
            self.space.claim(grow, self.space.available((self.used)()))?;
        } else {
            self.space.release(self.size - new_size);
        }
        self.size = new_size;
        Ok(())
    }
}

impl Drop for MemoryReservation {
    fn drop(&mut self) {
        self.space.release(self.size);
    }
}
