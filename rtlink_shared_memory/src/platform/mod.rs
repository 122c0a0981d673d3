//! OS layer: POSIX shared memory objects and the futex word.

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::{futex_wait, futex_wake};

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::signal::kill;
use nix::sys::stat::Mode;
use nix::unistd::Pid;
use std::fs::File;

/// Outcome of a bounded futex wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutexWait {
    /// Woken by a peer or the word no longer held the expected value.
    Woken,
    /// The relative timeout elapsed.
    TimedOut,
}

/// Create a new shared memory object of `total_size` bytes and map it.
///
/// Fails with `AlreadyExists` if the name is taken, whether by a live owner or
/// a stale object; the caller decides whether to reclaim. The new object is
/// zero-filled by the kernel. On failure after creation the name is removed
/// again.
pub fn create_segment(name: &str, total_size: usize) -> ShmResult<MmapMut> {
    let fd = shm_open(
        name,
        OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
        Mode::S_IRUSR | Mode::S_IWUSR,
    )
    .map_err(|source| match source {
        Errno::EEXIST => ShmError::AlreadyExists {
            name: name.to_string(),
        },
        source => ShmError::Allocation {
            name: name.to_string(),
            operation: "shm_open",
            source,
        },
    })?;
    let file = File::from(fd);

    if let Err(e) = file.set_len(total_size as u64) {
        let _ = shm_unlink(name);
        return Err(e.into());
    }

    let mmap = unsafe { MmapOptions::new().len(total_size).map_mut(&file) };
    match mmap {
        Ok(mmap) => Ok(mmap),
        Err(e) => {
            let _ = shm_unlink(name);
            Err(e.into())
        }
    }
}

/// Map an existing shared memory object read-write.
pub fn attach_segment(name: &str) -> ShmResult<MmapMut> {
    let fd = shm_open(name, OFlag::O_RDWR, Mode::empty()).map_err(|source| match source {
        Errno::ENOENT => ShmError::NotFound {
            name: name.to_string(),
        },
        source => ShmError::Allocation {
            name: name.to_string(),
            operation: "shm_open",
            source,
        },
    })?;
    let file = File::from(fd);
    let len = file.metadata()?.len() as usize;
    if len == 0 {
        return Err(ShmError::InvalidHeader {
            name: name.to_string(),
        });
    }

    let mmap = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
    Ok(mmap)
}

/// Remove the name of a shared memory object.
///
/// Existing mappings stay valid until every process unmaps them.
pub fn unlink_segment(name: &str) -> ShmResult<()> {
    shm_unlink(name).map_err(|source| match source {
        Errno::ENOENT => ShmError::NotFound {
            name: name.to_string(),
        },
        source => ShmError::Allocation {
            name: name.to_string(),
            operation: "shm_unlink",
            source,
        },
    })
}

/// Check if a process is alive using `kill(pid, 0)`.
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        // Exists, but owned by another user.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Sleep-poll fallback for targets without futex(2).
#[cfg(not(target_os = "linux"))]
pub fn futex_wait(
    word: &std::sync::atomic::AtomicU32,
    expected: u32,
    timeout: Option<std::time::Duration>,
) -> ShmResult<FutexWait> {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const POLL: Duration = Duration::from_micros(100);
    if word.load(Ordering::Acquire) != expected {
        return Ok(FutexWait::Woken);
    }
    match timeout {
        Some(t) if t <= POLL => {
            std::thread::sleep(t);
            Ok(FutexWait::TimedOut)
        }
        _ => {
            std::thread::sleep(POLL);
            Ok(FutexWait::Woken)
        }
    }
}

/// Waiters poll on targets without futex(2); nothing to wake.
#[cfg(not(target_os = "linux"))]
pub fn futex_wake(_word: &std::sync::atomic::AtomicU32, _count: i32) -> ShmResult<usize> {
    Ok(0)
}
