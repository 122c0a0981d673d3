//! Typed views on segments created by another process.
//!
//! This is the one place where mapped bytes become typed references. Attaching
//! checks that the object exists, starts with a valid [`SegmentHeader`] and
//! holds at least `size_of::<T>()` payload bytes. Type tags are not compared
//! here; callers that need that guarantee go through the interface handles.

use crate::error::{ShmError, ShmResult};
use crate::header::{HEADER_SIZE, SegmentHeader};
use crate::name::SegmentName;
use crate::payload::{ShmPayload, alignment_supported};
use crate::platform;
use memmap2::MmapMut;
use std::marker::PhantomData;
use tracing::debug;

fn validated_header<'a>(name: &SegmentName, mmap: &'a MmapMut) -> ShmResult<&'a SegmentHeader> {
    if mmap.len() < HEADER_SIZE {
        return Err(ShmError::InvalidHeader {
            name: name.to_string(),
        });
    }
    // Mapping is page aligned and at least HEADER_SIZE long.
    let header = unsafe { &*(mmap.as_ptr() as *const SegmentHeader) };
    if !header.is_valid() {
        return Err(ShmError::InvalidHeader {
            name: name.to_string(),
        });
    }
    Ok(header)
}

/// Validated mapping shared by both view kinds.
struct AttachedSegment {
    name: SegmentName,
    mmap: MmapMut,
}

impl AttachedSegment {
    fn attach<T: ShmPayload>(name: &SegmentName) -> ShmResult<Self> {
        if !alignment_supported::<T>() {
            return Err(ShmError::invalid_argument(format!(
                "alignment of '{}' exceeds the payload offset",
                T::TYPE_TAG
            )));
        }

        let mmap = platform::attach_segment(name.as_str())?;
        let header = validated_header(name, &mmap)?;

        let required = std::mem::size_of::<T>();
        let actual = header.payload_size().min(mmap.len() - HEADER_SIZE);
        if actual < required {
            return Err(ShmError::PayloadTooSmall {
                name: name.to_string(),
                required,
                actual,
            });
        }

        // Counted only once validation passed; Drop undoes exactly this.
        let count = header.add_attachment();
        debug!(segment = %name, attach_count = count, "segment attached");
        Ok(Self {
            name: name.clone(),
            mmap,
        })
    }

    fn header(&self) -> &SegmentHeader {
        // Mapping is page aligned and at least HEADER_SIZE long.
        unsafe { &*(self.mmap.as_ptr() as *const SegmentHeader) }
    }

    fn payload<T>(&self) -> &T {
        unsafe { &*(self.mmap.as_ptr().add(HEADER_SIZE) as *const T) }
    }

    fn payload_mut_ptr<T>(&mut self) -> *mut T {
        unsafe { self.mmap.as_mut_ptr().add(HEADER_SIZE) as *mut T }
    }
}

impl Drop for AttachedSegment {
    fn drop(&mut self) {
        let count = self.header().remove_attachment();
        debug!(segment = %self.name, attach_count = count, "segment detached");
    }
}

/// Snapshot of a segment's header, read without attaching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Segment name.
    pub name: SegmentName,
    /// Declared type tag.
    pub type_tag: String,
    /// Payload size in bytes.
    pub payload_size: usize,
    /// Whether a consumer must attach this segment.
    pub must_be_used: bool,
    /// Views attached at the time of the snapshot.
    pub attach_count: u32,
    /// Process that created the segment.
    pub owner_pid: u32,
}

/// Read the header of an existing segment without counting as an attachment.
pub fn inspect(name: &SegmentName) -> ShmResult<SegmentInfo> {
    let mmap = platform::attach_segment(name.as_str())?;
    let header = validated_header(name, &mmap)?;
    Ok(SegmentInfo {
        name: name.clone(),
        type_tag: header.type_tag().to_string(),
        payload_size: header.payload_size(),
        must_be_used: header.must_be_used(),
        attach_count: header.attach_count(),
        owner_pid: header.owner_pid(),
    })
}

/// Read-only view on an existing segment.
pub struct ReadOnlySegment<T: ShmPayload> {
    segment: AttachedSegment,
    _marker: PhantomData<T>,
}

impl<T: ShmPayload> ReadOnlySegment<T> {
    /// Attach to the segment called `name`.
    pub fn attach(name: &SegmentName) -> ShmResult<Self> {
        Ok(Self {
            segment: AttachedSegment::attach::<T>(name)?,
            _marker: PhantomData,
        })
    }

    /// Segment name.
    pub fn name(&self) -> &SegmentName {
        &self.segment.name
    }

    /// Segment header.
    pub fn header(&self) -> &SegmentHeader {
        self.segment.header()
    }

    /// Shared reference to the payload.
    ///
    /// Other processes may write concurrently; types with interior atomics
    /// (such as [`crate::futex::BinaryFutex`]) are used through this.
    pub fn get(&self) -> &T {
        self.segment.payload()
    }

    /// Copy of the current payload.
    pub fn read(&self) -> T
    where
        T: Copy,
    {
        unsafe { std::ptr::read_volatile(self.segment.payload::<T>()) }
    }
}

impl<T: ShmPayload> std::fmt::Debug for ReadOnlySegment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlySegment")
            .field("name", &self.segment.name)
            .field("header", self.header())
            .finish()
    }
}

/// Read-write view on an existing segment.
pub struct ReadWriteSegment<T: ShmPayload> {
    segment: AttachedSegment,
    _marker: PhantomData<T>,
}

impl<T: ShmPayload> ReadWriteSegment<T> {
    /// Attach to the segment called `name`.
    pub fn attach(name: &SegmentName) -> ShmResult<Self> {
        Ok(Self {
            segment: AttachedSegment::attach::<T>(name)?,
            _marker: PhantomData,
        })
    }

    /// Segment name.
    pub fn name(&self) -> &SegmentName {
        &self.segment.name
    }

    /// Segment header.
    pub fn header(&self) -> &SegmentHeader {
        self.segment.header()
    }

    /// Shared reference to the payload.
    pub fn get(&self) -> &T {
        self.segment.payload()
    }

    /// Copy of the current payload.
    pub fn read(&self) -> T
    where
        T: Copy,
    {
        unsafe { std::ptr::read_volatile(self.segment.payload::<T>()) }
    }

    /// Overwrite the payload.
    pub fn write(&mut self, value: T) {
        unsafe { std::ptr::write_volatile(self.segment.payload_mut_ptr::<T>(), value) }
    }
}

impl<T: ShmPayload> std::fmt::Debug for ReadWriteSegment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadWriteSegment")
            .field("name", &self.segment.name)
            .field("header", self.header())
            .finish()
    }
}
