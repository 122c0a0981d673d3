//! Per-process segment registry.
//!
//! [`SharedMemoryManager`] creates segments, keeps them mapped for its own
//! lifetime and unlinks every name it created exactly once on teardown. The
//! backing objects disappear once the last process unmaps them.
//!
//! The raw accessors here check payload sizes but not type tags; typed access
//! across processes goes through the interface handles.

use crate::directory::SegmentDirectory;
use crate::error::{ShmError, ShmResult};
use crate::header::{HEADER_SIZE, SegmentHeader};
use crate::name::SegmentName;
use crate::payload::{ShmPayload, alignment_supported};
use crate::platform;
use memmap2::MmapMut;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ptr::NonNull;
use tracing::{debug, info, warn};

/// Tag of opaque byte segments created without an explicit tag.
pub const BYTE_SEGMENT_TYPE_TAG: &str = "UInt8";

struct Entry {
    name: SegmentName,
    mmap: MmapMut,
    unlinked: bool,
}

impl Entry {
    fn header(&self) -> &SegmentHeader {
        unsafe { &*(self.mmap.as_ptr() as *const SegmentHeader) }
    }

    fn payload_size(&self) -> usize {
        self.header().payload_size()
    }

    fn payload_ptr(&mut self) -> NonNull<u8> {
        // Mapping is at least HEADER_SIZE + payload long and never null.
        unsafe { NonNull::new_unchecked(self.mmap.as_mut_ptr().add(HEADER_SIZE)) }
    }
}

/// Whether an existing object under `name` carries a valid header whose
/// creator no longer runs. Objects with an unreadable header are never
/// reclaimed.
fn owner_is_gone(name: &SegmentName) -> bool {
    let Ok(mmap) = platform::attach_segment(name.as_str()) else {
        return false;
    };
    if mmap.len() < HEADER_SIZE {
        return false;
    }
    // Mapping is page aligned and at least HEADER_SIZE long.
    let header = unsafe { &*(mmap.as_ptr() as *const SegmentHeader) };
    header.is_valid() && !header.owner_alive()
}

#[derive(Default)]
struct Registry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Registry {
    fn get_mut(&mut self, name: &str) -> ShmResult<&mut Entry> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(ShmError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// Owner of every segment this process creates.
#[derive(Default)]
pub struct SharedMemoryManager {
    registry: Mutex<Registry>,
}

impl SharedMemoryManager {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a segment holding `T::default()`, tagged with `T::TYPE_TAG`.
    pub fn add_segment_with_default<T: ShmPayload + Default>(
        &self,
        name: &SegmentName,
        must_be_used: bool,
    ) -> ShmResult<()> {
        self.add_segment_with_type_tag(name, must_be_used, T::default(), T::TYPE_TAG)
    }

    /// Create a segment holding `T::default()` with an explicit tag.
    pub fn add_segment_with_default_and_type_tag<T: ShmPayload + Default>(
        &self,
        name: &SegmentName,
        must_be_used: bool,
        type_tag: &str,
    ) -> ShmResult<()> {
        self.add_segment_with_type_tag(name, must_be_used, T::default(), type_tag)
    }

    /// Create a segment holding `value`, tagged with `T::TYPE_TAG`.
    pub fn add_segment<T: ShmPayload>(
        &self,
        name: &SegmentName,
        must_be_used: bool,
        value: T,
    ) -> ShmResult<()> {
        self.add_segment_with_type_tag(name, must_be_used, value, T::TYPE_TAG)
    }

    /// Create a segment holding `value` with an explicit tag.
    ///
    /// Fails with `AlreadyExists` if `name` is registered here or owned by any
    /// live process; the existing payload is left untouched. A segment whose
    /// creator has died is unlinked and created afresh.
    pub fn add_segment_with_type_tag<T: ShmPayload>(
        &self,
        name: &SegmentName,
        must_be_used: bool,
        value: T,
        type_tag: &str,
    ) -> ShmResult<()> {
        if !alignment_supported::<T>() {
            return Err(ShmError::invalid_argument(format!(
                "alignment of '{type_tag}' exceeds the payload offset"
            )));
        }
        self.create(
            name,
            must_be_used,
            type_tag,
            std::mem::size_of::<T>(),
            |payload| unsafe { std::ptr::write_volatile(payload.as_ptr() as *mut T, value) },
        )
    }

    /// Create an opaque, zero-filled payload of `size` bytes tagged `"UInt8"`.
    pub fn add_byte_segment(
        &self,
        name: &SegmentName,
        must_be_used: bool,
        size: usize,
    ) -> ShmResult<()> {
        self.add_byte_segment_with_type_tag(name, must_be_used, size, BYTE_SEGMENT_TYPE_TAG)
    }

    /// Create an opaque, zero-filled payload of `size` bytes with an explicit tag.
    pub fn add_byte_segment_with_type_tag(
        &self,
        name: &SegmentName,
        must_be_used: bool,
        size: usize,
        type_tag: &str,
    ) -> ShmResult<()> {
        if size == 0 {
            return Err(ShmError::invalid_argument(format!(
                "byte segment '{name}' must not be empty"
            )));
        }
        self.create(name, must_be_used, type_tag, size, |payload| unsafe {
            std::ptr::write_bytes(payload.as_ptr(), 0, size)
        })
    }

    fn create(
        &self,
        name: &SegmentName,
        must_be_used: bool,
        type_tag: &str,
        payload_size: usize,
        init: impl FnOnce(NonNull<u8>),
    ) -> ShmResult<()> {
        let mut registry = self.registry.lock();
        if registry.index.contains_key(name.as_str()) {
            return Err(ShmError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let header = SegmentHeader::new(type_tag, payload_size, must_be_used)?;
        let total_size = HEADER_SIZE + payload_size;
        let mmap = match platform::create_segment(name.as_str(), total_size) {
            Err(ShmError::AlreadyExists { .. }) if owner_is_gone(name) => {
                warn!(segment = %name, "reclaiming segment left by a dead process");
                match platform::unlink_segment(name.as_str()) {
                    Ok(()) | Err(ShmError::NotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
                platform::create_segment(name.as_str(), total_size)?
            }
            result => result?,
        };
        let mut entry = Entry {
            name: name.clone(),
            mmap,
            unlinked: false,
        };
        unsafe { std::ptr::write(entry.mmap.as_mut_ptr() as *mut SegmentHeader, header) };
        init(entry.payload_ptr());

        let index = registry.entries.len();
        registry.index.insert(name.as_str().to_string(), index);
        registry.entries.push(entry);

        info!(segment = %name, type_tag, payload_size, must_be_used, "segment created");
        Ok(())
    }

    /// Header of a segment registered here.
    pub fn get_segment_header(&self, name: &SegmentName) -> Option<&SegmentHeader> {
        let registry = self.registry.lock();
        let &i = registry.index.get(name.as_str())?;
        let header = registry.entries[i].header() as *const SegmentHeader;
        // Mappings live until `self` is dropped; entries are never removed earlier.
        Some(unsafe { &*header })
    }

    /// Copy of the payload of a segment registered here.
    ///
    /// The stored type is not checked; only the payload size is.
    pub fn get_segment_value<T: ShmPayload + Copy>(&self, name: &SegmentName) -> ShmResult<T> {
        let payload = self.sized_payload::<T>(name)?;
        Ok(unsafe { std::ptr::read_volatile(payload.as_ptr() as *const T) })
    }

    /// Overwrite the payload of a segment registered here.
    pub fn set_segment_value<T: ShmPayload>(&self, name: &SegmentName, value: T) -> ShmResult<()> {
        let payload = self.sized_payload::<T>(name)?;
        unsafe { std::ptr::write_volatile(payload.as_ptr() as *mut T, value) };
        Ok(())
    }

    fn sized_payload<T>(&self, name: &SegmentName) -> ShmResult<NonNull<u8>> {
        let mut registry = self.registry.lock();
        let entry = registry.get_mut(name.as_str())?;
        let required = std::mem::size_of::<T>();
        let actual = entry.payload_size();
        if actual < required {
            return Err(ShmError::PayloadTooSmall {
                name: name.to_string(),
                required,
                actual,
            });
        }
        Ok(entry.payload_ptr())
    }

    /// Untyped payload pointer of a segment registered here, for bulk copies.
    pub fn get_raw_value(&self, name: &SegmentName) -> Option<NonNull<u8>> {
        let mut registry = self.registry.lock();
        registry
            .get_mut(name.as_str())
            .ok()
            .map(Entry::payload_ptr)
    }

    /// Copy `bytes` to the start of a segment's payload.
    pub fn write_raw_value(&self, name: &SegmentName, bytes: &[u8]) -> ShmResult<()> {
        let mut registry = self.registry.lock();
        let entry = registry.get_mut(name.as_str())?;
        let actual = entry.payload_size();
        if bytes.len() > actual {
            return Err(ShmError::PayloadTooSmall {
                name: name.to_string(),
                required: bytes.len(),
                actual,
            });
        }
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), entry.payload_ptr().as_ptr(), bytes.len())
        };
        Ok(())
    }

    /// Whether `name` was registered here.
    pub fn contains(&self, name: &SegmentName) -> bool {
        self.registry.lock().index.contains_key(name.as_str())
    }

    /// Registered names in creation order.
    pub fn get_registered_memory_names(&self) -> Vec<String> {
        self.registry
            .lock()
            .entries
            .iter()
            .map(|e| e.name.to_string())
            .collect()
    }

    /// Directory of every registered segment with its must-be-used flag.
    pub fn get_directory(&self) -> ShmResult<SegmentDirectory> {
        let registry = self.registry.lock();
        let mut directory = SegmentDirectory::new();
        for entry in &registry.entries {
            directory.push(entry.name.as_str(), entry.header().must_be_used())?;
        }
        Ok(directory)
    }

    /// Unlink every registered name not yet unlinked. Returns how many were.
    ///
    /// Mappings stay valid until the manager is dropped.
    pub fn unlink_all(&self) -> usize {
        let mut registry = self.registry.lock();
        let mut unlinked = 0;
        for entry in registry.entries.iter_mut().filter(|e| !e.unlinked) {
            entry.unlinked = true;
            unlinked += 1;
            match platform::unlink_segment(entry.name.as_str()) {
                Ok(()) => debug!(segment = %entry.name, "segment unlinked"),
                Err(e) => warn!(segment = %entry.name, "unlink failed: {e}"),
            }
        }
        if unlinked > 0 {
            info!(count = unlinked, "segments unlinked");
        }
        unlinked
    }
}

impl Drop for SharedMemoryManager {
    fn drop(&mut self) {
        self.unlink_all();
    }
}

impl std::fmt::Debug for SharedMemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMemoryManager")
            .field("segments", &self.get_registered_memory_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::futex::BinaryFutex;
    use rtlink_common::error::ErrorKind;

    fn unique(interface: &str) -> SegmentName {
        SegmentName::new("", &format!("mgrtest_{}", std::process::id()), interface).unwrap()
    }

    #[test]
    fn add_then_get_round_trip() {
        let manager = SharedMemoryManager::new();
        let name = unique("answer");
        manager.add_segment(&name, false, 42i32).unwrap();
        assert_eq!(manager.get_segment_value::<i32>(&name).unwrap(), 42);

        manager.set_segment_value(&name, 7i32).unwrap();
        assert_eq!(manager.get_segment_value::<i32>(&name).unwrap(), 7);

        let header = manager.get_segment_header(&name).unwrap();
        assert_eq!(header.type_tag(), "Int32");
        assert_eq!(header.payload_size(), 4);
    }

    #[test]
    fn duplicate_leaves_original_value() {
        let manager = SharedMemoryManager::new();
        let name = unique("dup");
        manager.add_segment(&name, false, 42i32).unwrap();

        let err = manager.add_segment(&name, true, 13i32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(manager.get_segment_value::<i32>(&name).unwrap(), 42);
        assert!(!manager.get_segment_header(&name).unwrap().must_be_used());
    }

    #[test]
    fn second_manager_cannot_take_over_live_segment() {
        let first = SharedMemoryManager::new();
        let name = unique("contended");
        first.add_segment(&name, true, 42i32).unwrap();
        let reader = crate::segment::ReadOnlySegment::<i32>::attach(&name).unwrap();

        let second = SharedMemoryManager::new();
        let err = second.add_segment(&name, false, 7i32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(second.get_registered_memory_names().is_empty());

        assert_eq!(reader.read(), 42);
        assert_eq!(reader.header().attach_count(), 1);
        assert!(reader.header().must_be_used());

        drop(second);
        assert!(crate::segment::ReadOnlySegment::<i32>::attach(&name).is_ok());
    }

    fn leave_segment(name: &SegmentName, header: SegmentHeader) {
        let mut mmap = platform::create_segment(name.as_str(), HEADER_SIZE + 4).unwrap();
        unsafe { std::ptr::write(mmap.as_mut_ptr() as *mut SegmentHeader, header) };
    }

    fn exited_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[test]
    fn segment_of_dead_owner_is_reclaimed() {
        let name = unique("orphan");
        let header = SegmentHeader::new("Int32", 4, false)
            .unwrap()
            .with_owner_pid(exited_pid());
        leave_segment(&name, header);

        let manager = SharedMemoryManager::new();
        manager.add_segment(&name, true, 9i32).unwrap();
        assert_eq!(manager.get_segment_value::<i32>(&name).unwrap(), 9);
        let header = manager.get_segment_header(&name).unwrap();
        assert_eq!(header.owner_pid(), std::process::id());
        assert!(header.must_be_used());
    }

    #[test]
    fn unreadable_existing_object_is_not_reclaimed() {
        let name = unique("foreign");
        platform::create_segment(name.as_str(), HEADER_SIZE + 4).unwrap();

        let manager = SharedMemoryManager::new();
        let err = manager.add_segment(&name, false, 1i32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        platform::unlink_segment(name.as_str()).unwrap();
    }

    #[test]
    fn defaults_and_explicit_tags() {
        let manager = SharedMemoryManager::new();
        let futex = unique("futex");
        let tagged = unique("tagged");
        manager
            .add_segment_with_default::<BinaryFutex>(&futex, false)
            .unwrap();
        manager
            .add_segment_with_default_and_type_tag::<u64>(&tagged, true, "EncoderTicks")
            .unwrap();

        assert_eq!(
            manager.get_segment_header(&futex).unwrap().type_tag(),
            "BinaryFutex"
        );
        assert_eq!(
            manager.get_segment_header(&tagged).unwrap().type_tag(),
            "EncoderTicks"
        );
        assert_eq!(manager.get_segment_value::<u64>(&tagged).unwrap(), 0);
    }

    #[test]
    fn oversized_type_tag_is_invalid_argument() {
        let manager = SharedMemoryManager::new();
        let err = manager
            .add_segment_with_type_tag(&unique("longtag"), false, 1u8, &"x".repeat(97))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(manager.get_registered_memory_names().is_empty());
    }

    #[test]
    fn byte_segment_raw_access() {
        let manager = SharedMemoryManager::new();
        let name = unique("blob");
        manager.add_byte_segment(&name, false, 16).unwrap();
        assert_eq!(
            manager.get_segment_header(&name).unwrap().type_tag(),
            BYTE_SEGMENT_TYPE_TAG
        );

        manager.write_raw_value(&name, b"proto-bytes").unwrap();
        let raw = manager.get_raw_value(&name).unwrap();
        let copied = unsafe { std::slice::from_raw_parts(raw.as_ptr(), 11) };
        assert_eq!(copied, b"proto-bytes");

        let err = manager.write_raw_value(&name, &[0u8; 17]).unwrap_err();
        assert!(matches!(err, ShmError::PayloadTooSmall { .. }));

        assert_eq!(
            manager
                .add_byte_segment(&unique("empty"), false, 0)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidArgument
        );
        assert!(manager.get_raw_value(&unique("absent")).is_none());
    }

    #[test]
    fn names_and_directory_follow_creation_order() {
        let manager = SharedMemoryManager::new();
        let a = unique("a");
        let b = unique("b");
        manager.add_segment(&a, true, 1u32).unwrap();
        manager.add_segment(&b, false, 2u32).unwrap();

        assert_eq!(
            manager.get_registered_memory_names(),
            [a.to_string(), b.to_string()]
        );
        let directory = manager.get_directory().unwrap();
        assert_eq!(directory.names().unwrap(), [a.to_string(), b.to_string()]);
        assert_eq!(directory.required_interface_names().unwrap(), ["a"]);
    }

    #[test]
    fn missing_segment_is_not_found() {
        let manager = SharedMemoryManager::new();
        let err = manager
            .get_segment_value::<i32>(&unique("nothing"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(manager.get_segment_header(&unique("nothing")).is_none());
    }

    #[test]
    fn unlink_all_is_idempotent() {
        let empty = SharedMemoryManager::new();
        assert_eq!(empty.unlink_all(), 0);

        let manager = SharedMemoryManager::new();
        manager.add_segment(&unique("u1"), false, 1u8).unwrap();
        manager.add_segment(&unique("u2"), false, 2u8).unwrap();
        assert_eq!(manager.unlink_all(), 2);
        assert_eq!(manager.unlink_all(), 0);
        // Local mapping is still readable after unlink.
        assert_eq!(manager.get_segment_value::<u8>(&unique("u2")).unwrap(), 2);
    }
}
