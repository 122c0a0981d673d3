//! Segment header.
//!
//! Every segment starts with a 128-byte [`SegmentHeader`] followed by the
//! payload:
//!
//! ```text
//! offset 0    SegmentHeader (magic, payload size, attach count, flags, type tag, owner pid)
//! offset 128  payload
//! ```

use crate::error::{ShmError, ShmResult};
use rtlink_common::consts::{CACHE_LINE_SIZE, TYPE_TAG_MAX_LEN};
use static_assertions::const_assert_eq;
use std::sync::atomic::{AtomicU32, Ordering};

/// Magic bytes identifying an rtlink segment.
pub const SEGMENT_MAGIC: [u8; 8] = *b"RTLKSEG1";

/// Header size in bytes; also the payload offset.
pub const HEADER_SIZE: usize = std::mem::size_of::<SegmentHeader>();

/// Fixed metadata at the start of every segment.
#[repr(C, align(64))]
pub struct SegmentHeader {
    magic: [u8; 8],
    payload_size: u64,
    attach_count: AtomicU32,
    must_be_used: u8,
    type_tag_len: u8,
    _reserved: [u8; 2],
    type_tag: [u8; TYPE_TAG_MAX_LEN],
    owner_pid: u32,
    _padding: [u8; 4],
}

const_assert_eq!(std::mem::size_of::<SegmentHeader>(), 128);
const_assert_eq!(std::mem::align_of::<SegmentHeader>(), CACHE_LINE_SIZE);

impl SegmentHeader {
    /// Build a header for a new segment.
    pub fn new(type_tag: &str, payload_size: usize, must_be_used: bool) -> ShmResult<Self> {
        if type_tag.len() > TYPE_TAG_MAX_LEN {
            return Err(ShmError::invalid_argument(format!(
                "type tag '{type_tag}' exceeds {TYPE_TAG_MAX_LEN} bytes"
            )));
        }
        let mut tag = [0u8; TYPE_TAG_MAX_LEN];
        tag[..type_tag.len()].copy_from_slice(type_tag.as_bytes());

        Ok(Self {
            magic: SEGMENT_MAGIC,
            payload_size: payload_size as u64,
            attach_count: AtomicU32::new(0),
            must_be_used: u8::from(must_be_used),
            type_tag_len: type_tag.len() as u8,
            _reserved: [0; 2],
            type_tag: tag,
            owner_pid: std::process::id(),
            _padding: [0; 4],
        })
    }

    /// Whether the magic bytes match.
    pub fn is_valid(&self) -> bool {
        self.magic == SEGMENT_MAGIC
    }

    /// Payload size in bytes.
    pub fn payload_size(&self) -> usize {
        self.payload_size as usize
    }

    /// Whether a consumer must attach this segment.
    pub fn must_be_used(&self) -> bool {
        self.must_be_used != 0
    }

    /// Declared type tag. Invalid UTF-8 or an out-of-range length yields `""`.
    pub fn type_tag(&self) -> &str {
        let len = usize::from(self.type_tag_len).min(TYPE_TAG_MAX_LEN);
        std::str::from_utf8(&self.type_tag[..len]).unwrap_or("")
    }

    /// Process that created the segment.
    pub fn owner_pid(&self) -> u32 {
        self.owner_pid
    }

    /// Whether the creating process still exists.
    pub fn owner_alive(&self) -> bool {
        crate::platform::is_process_alive(self.owner_pid)
    }

    #[cfg(test)]
    pub(crate) fn with_owner_pid(mut self, pid: u32) -> Self {
        self.owner_pid = pid;
        self
    }

    /// Number of views currently attached across all processes.
    pub fn attach_count(&self) -> u32 {
        self.attach_count.load(Ordering::Acquire)
    }

    pub(crate) fn add_attachment(&self) -> u32 {
        self.attach_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn remove_attachment(&self) -> u32 {
        // Saturate: a crashed peer may have left the count inconsistent.
        let previous = self
            .attach_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }
}

impl std::fmt::Debug for SegmentHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentHeader")
            .field("valid", &self.is_valid())
            .field("payload_size", &self.payload_size())
            .field("attach_count", &self.attach_count())
            .field("must_be_used", &self.must_be_used())
            .field("type_tag", &self.type_tag())
            .field("owner_pid", &self.owner_pid)
            .finish()
    }
}
