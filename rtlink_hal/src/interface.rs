//! Hardware interface handles.
//!
//! A handle is a typed view whose segment tag was confirmed to match
//! `T::TYPE_TAG`. Strict handles also watch the module's cycle state and report
//! whether the payload was written in the current cycle.

use crate::cycle::{CycleStamped, CycleState, Freshness};
use crate::error::{InterfaceError, InterfaceResult};
use rtlink_shared_memory::{ReadOnlySegment, ReadWriteSegment, SegmentHeader, SegmentName, ShmPayload};

/// Fail unless `header` declares `T`'s tag.
pub(crate) fn check_type_tag<T: ShmPayload>(
    name: &SegmentName,
    header: &SegmentHeader,
) -> InterfaceResult<()> {
    let actual = header.type_tag();
    if actual != T::TYPE_TAG {
        return Err(InterfaceError::TypeMismatch {
            interface: name.to_string(),
            expected: T::TYPE_TAG.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Read-only handle on a hardware interface.
#[derive(Debug)]
pub struct HardwareInterfaceHandle<T: ShmPayload> {
    segment: ReadOnlySegment<T>,
}

impl<T: ShmPayload> HardwareInterfaceHandle<T> {
    /// Wrap a view after checking its tag.
    pub fn new(segment: ReadOnlySegment<T>) -> InterfaceResult<Self> {
        check_type_tag::<T>(segment.name(), segment.header())?;
        Ok(Self { segment })
    }

    /// Segment name.
    pub fn name(&self) -> &SegmentName {
        self.segment.name()
    }

    /// Shared reference to the interface.
    pub fn get(&self) -> &T {
        self.segment.get()
    }

    /// Copy of the interface.
    pub fn read(&self) -> T
    where
        T: Copy,
    {
        self.segment.read()
    }
}

/// Read-write handle on a hardware interface.
#[derive(Debug)]
pub struct MutableHardwareInterfaceHandle<T: ShmPayload> {
    segment: ReadWriteSegment<T>,
}

impl<T: ShmPayload> MutableHardwareInterfaceHandle<T> {
    /// Wrap a view after checking its tag.
    pub fn new(segment: ReadWriteSegment<T>) -> InterfaceResult<Self> {
        check_type_tag::<T>(segment.name(), segment.header())?;
        Ok(Self { segment })
    }

    /// Segment name.
    pub fn name(&self) -> &SegmentName {
        self.segment.name()
    }

    /// Shared reference to the interface.
    pub fn get(&self) -> &T {
        self.segment.get()
    }

    /// Copy of the interface.
    pub fn read(&self) -> T
    where
        T: Copy,
    {
        self.segment.read()
    }

    /// Overwrite the interface.
    pub fn write(&mut self, value: T) {
        self.segment.write(value);
    }
}

/// Read-only handle that reports freshness against the module's cycle.
#[derive(Debug)]
pub struct StrictHardwareInterfaceHandle<T: ShmPayload + CycleStamped> {
    segment: ReadOnlySegment<T>,
    cycle_state: ReadOnlySegment<CycleState>,
}

impl<T: ShmPayload + CycleStamped> StrictHardwareInterfaceHandle<T> {
    /// Wrap an interface view and a cycle state view after checking both tags.
    pub fn new(
        segment: ReadOnlySegment<T>,
        cycle_state: ReadOnlySegment<CycleState>,
    ) -> InterfaceResult<Self> {
        check_type_tag::<T>(segment.name(), segment.header())?;
        check_type_tag::<CycleState>(cycle_state.name(), cycle_state.header())?;
        Ok(Self {
            segment,
            cycle_state,
        })
    }

    /// Segment name.
    pub fn name(&self) -> &SegmentName {
        self.segment.name()
    }

    /// Cycle currently published by the module.
    pub fn current_cycle(&self) -> u64 {
        self.cycle_state.read().cycle
    }

    /// Whether the interface was written in the current cycle.
    pub fn freshness(&self) -> Freshness {
        Freshness::evaluate(self.segment.get().updated_cycle(), self.current_cycle())
    }

    /// Shorthand for `freshness().is_fresh()`.
    pub fn is_fresh(&self) -> bool {
        self.freshness().is_fresh()
    }

    /// Shared reference to the interface, regardless of freshness.
    pub fn value(&self) -> &T {
        self.segment.get()
    }

    /// Copy of the interface together with its freshness.
    pub fn read(&self) -> (T, Freshness)
    where
        T: Copy,
    {
        let value = self.segment.read();
        let freshness = Freshness::evaluate(value.updated_cycle(), self.current_cycle());
        (value, freshness)
    }
}

/// Read-write strict handle; [`commit`](Self::commit) stamps the current cycle.
#[derive(Debug)]
pub struct MutableStrictHardwareInterfaceHandle<T: ShmPayload + CycleStamped> {
    segment: ReadWriteSegment<T>,
    cycle_state: ReadOnlySegment<CycleState>,
}

impl<T: ShmPayload + CycleStamped> MutableStrictHardwareInterfaceHandle<T> {
    /// Wrap an interface view and a cycle state view after checking both tags.
    pub fn new(
        segment: ReadWriteSegment<T>,
        cycle_state: ReadOnlySegment<CycleState>,
    ) -> InterfaceResult<Self> {
        check_type_tag::<T>(segment.name(), segment.header())?;
        check_type_tag::<CycleState>(cycle_state.name(), cycle_state.header())?;
        Ok(Self {
            segment,
            cycle_state,
        })
    }

    /// Segment name.
    pub fn name(&self) -> &SegmentName {
        self.segment.name()
    }

    /// Cycle currently published by the module.
    pub fn current_cycle(&self) -> u64 {
        self.cycle_state.read().cycle
    }

    /// Whether the interface was written in the current cycle.
    pub fn freshness(&self) -> Freshness {
        Freshness::evaluate(self.segment.get().updated_cycle(), self.current_cycle())
    }

    /// Shorthand for `freshness().is_fresh()`.
    pub fn is_fresh(&self) -> bool {
        self.freshness().is_fresh()
    }

    /// Shared reference to the interface, regardless of freshness.
    pub fn value(&self) -> &T {
        self.segment.get()
    }

    /// Stamp `value` with the current cycle and write it. Returns the cycle.
    pub fn commit(&mut self, mut value: T) -> u64 {
        let cycle = self.current_cycle();
        value.set_updated_cycle(cycle);
        self.segment.write(value);
        cycle
    }
}
