//! Module directory ("module info").
//!
//! A [`SegmentDirectory`] lists every segment a module exports, in registration
//! order, with a marker for the ones consumers are required to attach. It is a
//! fixed-size `#[repr(C)]` record so it can itself be published as a segment
//! payload.

use crate::error::{ShmError, ShmResult};
use crate::name::interface_name_from_segment_name;
use rtlink_common::consts::{MAX_DIRECTORY_ENTRIES, SEGMENT_NAME_MAX_LEN};

/// One fixed-length, NUL padded name record.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DirectoryEntry {
    name: [u8; SEGMENT_NAME_MAX_LEN],
    must_be_used: u8,
}

impl DirectoryEntry {
    const EMPTY: Self = Self {
        name: [0; SEGMENT_NAME_MAX_LEN],
        must_be_used: 0,
    };

    /// Segment name with trailing padding trimmed.
    pub fn name(&self) -> ShmResult<&str> {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SEGMENT_NAME_MAX_LEN);
        std::str::from_utf8(&self.name[..len]).map_err(|_| ShmError::Decode {
            record: String::from_utf8_lossy(&self.name[..len]).into_owned(),
            reason: "name is not valid UTF-8",
        })
    }

    /// Whether consumers must attach this segment.
    pub fn must_be_used(&self) -> bool {
        self.must_be_used != 0
    }
}

/// Ordered list of exported segment names with a required subset.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SegmentDirectory {
    len: u32,
    entries: [DirectoryEntry; MAX_DIRECTORY_ENTRIES],
}

crate::impl_shm_payload!(SegmentDirectory => "SegmentDirectory");

impl SegmentDirectory {
    /// Empty directory.
    pub const fn new() -> Self {
        Self {
            len: 0,
            entries: [DirectoryEntry::EMPTY; MAX_DIRECTORY_ENTRIES],
        }
    }

    /// Append a record.
    pub fn push(&mut self, name: &str, must_be_used: bool) -> ShmResult<()> {
        let index = self.len();
        if index >= MAX_DIRECTORY_ENTRIES {
            return Err(ShmError::invalid_argument(format!(
                "directory holds at most {MAX_DIRECTORY_ENTRIES} segments"
            )));
        }
        if name.len() > SEGMENT_NAME_MAX_LEN || name.as_bytes().contains(&0) {
            return Err(ShmError::invalid_argument(format!(
                "'{name}' cannot be stored in a directory record"
            )));
        }

        let entry = &mut self.entries[index];
        *entry = DirectoryEntry::EMPTY;
        entry.name[..name.len()].copy_from_slice(name.as_bytes());
        entry.must_be_used = u8::from(must_be_used);
        self.len += 1;
        Ok(())
    }

    /// Number of records. A corrupt length is clamped to the capacity.
    pub fn len(&self) -> usize {
        (self.len as usize).min(MAX_DIRECTORY_ENTRIES)
    }

    /// Whether the directory has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records in registration order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries[..self.len()]
    }

    /// Full segment names.
    pub fn names(&self) -> ShmResult<Vec<String>> {
        self.collect(|_| true, |name| Ok(name.to_string()))
    }

    /// Full names of the segments consumers must attach.
    pub fn required_names(&self) -> ShmResult<Vec<String>> {
        self.collect(DirectoryEntry::must_be_used, |name| Ok(name.to_string()))
    }

    /// Interface names with the module (and namespace) prefix stripped.
    ///
    /// Fails with a decode error if a record is not `"/<module>__<segment>"`.
    pub fn interface_names(&self) -> ShmResult<Vec<String>> {
        self.collect(|_| true, decode_interface)
    }

    /// Interface names of the required subset.
    pub fn required_interface_names(&self) -> ShmResult<Vec<String>> {
        self.collect(DirectoryEntry::must_be_used, decode_interface)
    }

    fn collect(
        &self,
        filter: impl Fn(&DirectoryEntry) -> bool,
        map: impl Fn(&str) -> ShmResult<String>,
    ) -> ShmResult<Vec<String>> {
        self.entries()
            .iter()
            .filter(|entry| filter(entry))
            .map(|entry| map(entry.name()?))
            .collect()
    }
}

fn decode_interface(name: &str) -> ShmResult<String> {
    interface_name_from_segment_name(name).map(str::to_string)
}

impl Default for SegmentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SegmentDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries()
                    .iter()
                    .map(|e| (e.name().unwrap_or("<invalid>"), e.must_be_used())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlink_common::error::ErrorKind;

    fn directory() -> SegmentDirectory {
        let mut dir = SegmentDirectory::new();
        dir.push("/arm__joint_state", true).unwrap();
        dir.push("/arm__diagnostics", false).unwrap();
        dir.push("/arm__command", true).unwrap();
        dir
    }

    #[test]
    fn names_keep_order_and_trim_padding() {
        let dir = directory();
        assert_eq!(dir.len(), 3);
        assert_eq!(
            dir.names().unwrap(),
            ["/arm__joint_state", "/arm__diagnostics", "/arm__command"]
        );
        assert_eq!(
            dir.required_names().unwrap(),
            ["/arm__joint_state", "/arm__command"]
        );
    }

    #[test]
    fn interface_names_strip_module_prefix() {
        let dir = directory();
        assert_eq!(
            dir.interface_names().unwrap(),
            ["joint_state", "diagnostics", "command"]
        );
        assert_eq!(
            dir.required_interface_names().unwrap(),
            ["joint_state", "command"]
        );
    }

    #[test]
    fn malformed_record_fails_decode() {
        let mut dir = directory();
        dir.push("/no_separator", false).unwrap();
        assert_eq!(dir.interface_names().unwrap_err().kind(), ErrorKind::Decode);
        // The malformed record is optional, so the required subset still decodes.
        assert_eq!(dir.required_interface_names().unwrap().len(), 2);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut dir = SegmentDirectory::new();
        for i in 0..MAX_DIRECTORY_ENTRIES {
            dir.push(&format!("/m__s{i}"), false).unwrap();
        }
        let err = dir.push("/m__overflow", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn corrupt_length_is_clamped() {
        let mut dir = directory();
        dir.len = u32::MAX;
        assert_eq!(dir.len(), MAX_DIRECTORY_ENTRIES);
        assert!(dir.names().is_ok());
    }
}
