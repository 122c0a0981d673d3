//! Linux-specific futex operations
//!
//! The futex word lives in a `MAP_SHARED` mapping, so the non-private
//! operations are used: waiters and wakers may be in different processes.

use super::FutexWait;
use crate::error::{ShmError, ShmResult};
use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Block while `word` holds `expected`, for at most `timeout`.
///
/// Spurious wakeups and signal interruptions are reported as
/// [`FutexWait::Woken`]; callers re-check their condition.
pub fn futex_wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> ShmResult<FutexWait> {
    let ts = timeout.map(|t| libc::timespec {
        tv_sec: t.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: t.subsec_nanos() as libc::c_long,
    });
    let ts_ptr = ts
        .as_ref()
        .map_or(std::ptr::null(), |t| t as *const libc::timespec);

    let result = unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAIT,
            expected,
            ts_ptr,
            std::ptr::null::<u32>(),
            0u32,
        )
    };

    if result == 0 {
        return Ok(FutexWait::Woken);
    }
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ETIMEDOUT) => Ok(FutexWait::TimedOut),
        // EAGAIN: the word changed before we slept. EINTR: interrupted by a signal.
        Some(libc::EAGAIN) | Some(libc::EINTR) => Ok(FutexWait::Woken),
        _ => Err(ShmError::Io { source: err }),
    }
}

/// Wake up to `count` waiters blocked on `word`. Returns how many were woken.
pub fn futex_wake(word: &AtomicU32, count: i32) -> ShmResult<usize> {
    let result = unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAKE,
            count,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        )
    };

    if result < 0 {
        return Err(ShmError::Io {
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(result as usize)
}
