//! Binary wait/signal primitive.
//!
//! [`BinaryFutex`] is a single `AtomicU32` counter placed in a shared memory
//! segment. `post` adds one unit and wakes every waiter; `wait_until` consumes
//! one unit, blocking on the futex word until a unit is available or the
//! deadline passes. Posts accumulate: a value greater than zero means
//! "signaled".

use crate::error::{ShmError, ShmResult};
use crate::platform::{self, FutexWait};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Cross-process counting signal stored in shared memory.
#[repr(C)]
#[derive(Debug, Default)]
pub struct BinaryFutex {
    value: AtomicU32,
}

crate::impl_shm_payload!(BinaryFutex => "BinaryFutex");

impl BinaryFutex {
    /// New primitive holding `value` units.
    pub const fn new(value: u32) -> Self {
        Self {
            value: AtomicU32::new(value),
        }
    }

    /// Add one unit and wake all waiters. Never blocks.
    pub fn post(&self) -> ShmResult<()> {
        self.value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_add(1))
            .map_err(|_| ShmError::invalid_argument("futex counter overflow"))?;
        platform::futex_wake(&self.value, i32::MAX)?;
        Ok(())
    }

    /// Consume one unit if available, without blocking.
    pub fn try_wait(&self) -> bool {
        self.value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1))
            .is_ok()
    }

    /// Consume one unit, blocking until one is posted or `deadline` passes.
    ///
    /// A unit already present is consumed even if `deadline` is in the past.
    pub fn wait_until(&self, deadline: Instant) -> ShmResult<()> {
        loop {
            if self.try_wait() {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ShmError::DeadlineExceeded {
                    operation: "futex wait",
                });
            }

            // Sleeps only while the counter is still zero; a post in between
            // changes the word and the syscall returns at once. Either outcome
            // loops back to re-check the counter and the deadline.
            let _: FutexWait = platform::futex_wait(&self.value, 0, Some(deadline - now))?;
        }
    }

    /// Current number of units, without consuming.
    pub fn value(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }
}
