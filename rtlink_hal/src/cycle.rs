//! Control cycle state and payload freshness.
//!
//! Each module exports a `cycle_state` segment holding the current control
//! cycle. Payloads that carry their own update cycle implement
//! [`CycleStamped`]; strict handles compare the two and report [`Freshness`].
//! What to do with stale data is up to the caller.

use rtlink_shared_memory::impl_shm_payload;

/// Current control cycle, published in the module's `cycle_state` segment.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleState {
    /// Monotonic cycle counter.
    pub cycle: u64,
}

impl_shm_payload!(CycleState => "CycleState");

/// Payload that records the cycle in which it was last written.
pub trait CycleStamped {
    /// Cycle of the last update.
    fn updated_cycle(&self) -> u64;

    /// Record `cycle` as the cycle of the last update.
    fn set_updated_cycle(&mut self, cycle: u64);
}

/// Whether a payload was written in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Updated in the current cycle.
    Fresh,
    /// Last updated in an earlier (or unrelated) cycle.
    Stale,
}

impl Freshness {
    /// Compare a payload's update cycle with the current cycle.
    pub fn evaluate(updated_cycle: u64, current_cycle: u64) -> Self {
        if updated_cycle == current_cycle {
            Self::Fresh
        } else {
            Self::Stale
        }
    }

    /// Whether this is [`Freshness::Fresh`].
    pub fn is_fresh(self) -> bool {
        self == Self::Fresh
    }
}
