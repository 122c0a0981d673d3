//! Thread wrapper with explicit stop handles.
//!
//! A [`Thread`] owns an OS thread and a [`StopSource`]. The spawned closure
//! receives a [`StopToken`] and is expected to return once
//! [`StopToken::stop_requested`] turns true. Dropping a joinable thread
//! requests stop and joins it.
//!
//! Real-time options (SCHED_FIFO priority, CPU affinity) are applied inside the
//! new thread when the `rt` feature is enabled; without it they are ignored.

use crate::error::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from spawning or joining threads.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// The OS refused to create the thread.
    #[error("failed to spawn thread '{name}': {source}")]
    Spawn {
        /// Thread name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `join` was called on a thread that was already joined.
    #[error("thread '{name}' is not joinable")]
    NotJoinable {
        /// Thread name.
        name: String,
    },

    /// The thread body panicked.
    #[error("thread '{name}' panicked")]
    Panicked {
        /// Thread name.
        name: String,
    },

    /// Real-time setup of the calling thread failed.
    #[error("real-time setup failed: {0}")]
    RtSetup(String),
}

impl ThreadError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Spawn { .. } => ErrorKind::Allocation,
            Self::NotJoinable { .. } | Self::Panicked { .. } => ErrorKind::FailedPrecondition,
            Self::RtSetup(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Owner side of a stop request.
///
/// Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct StopSource {
    flag: Arc<AtomicBool>,
}

impl StopSource {
    /// Create a fresh, un-triggered stop source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request stop. Returns `true` only for the call that made the transition.
    pub fn request_stop(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    /// Whether stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Observer token bound to this source.
    pub fn token(&self) -> StopToken {
        StopToken {
            flag: Arc::clone(&self.flag),
        }
    }
}

/// Observer side of a stop request.
#[derive(Debug, Clone)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    /// Whether stop has been requested on the owning source.
    pub fn stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Options applied to a spawned [`Thread`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadOptions {
    /// OS thread name.
    pub name: Option<String>,
    /// SCHED_FIFO priority (1-99). `None` keeps the default policy.
    pub realtime_priority: Option<i32>,
    /// CPUs the thread is pinned to. Empty leaves affinity unchanged.
    pub cpu_affinity: Vec<usize>,
}

impl ThreadOptions {
    /// Set the thread name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Run the thread under SCHED_FIFO with `priority`.
    pub fn with_realtime_priority(mut self, priority: i32) -> Self {
        self.realtime_priority = Some(priority);
        self
    }

    /// Pin the thread to `cpus`.
    pub fn with_cpu_affinity(mut self, cpus: Vec<usize>) -> Self {
        self.cpu_affinity = cpus;
        self
    }
}

/// An OS thread paired with its stop source.
pub struct Thread {
    name: String,
    stop_source: StopSource,
    handle: Option<JoinHandle<()>>,
}

impl Thread {
    /// Spawn `body` on a new thread configured by `options`.
    pub fn spawn<F>(options: &ThreadOptions, body: F) -> Result<Self, ThreadError>
    where
        F: FnOnce(StopToken) + Send + 'static,
    {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| "rtlink-thread".to_string());
        let stop_source = StopSource::new();
        let token = stop_source.token();
        let rt_options = options.clone();

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                if let Err(e) = apply_realtime_options(&rt_options) {
                    warn!("thread continues without real-time settings: {e}");
                }
                body(token);
            })
            .map_err(|source| ThreadError::Spawn {
                name: name.clone(),
                source,
            })?;

        debug!(thread = %name, "thread spawned");
        Ok(Self {
            name,
            stop_source,
            handle: Some(handle),
        })
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread has not been joined yet.
    pub fn joinable(&self) -> bool {
        self.handle.is_some()
    }

    /// Request the thread to stop. See [`StopSource::request_stop`].
    pub fn request_stop(&self) -> bool {
        self.stop_source.request_stop()
    }

    /// Stop source shared with the running body.
    pub fn stop_source(&self) -> &StopSource {
        &self.stop_source
    }

    /// New observer token for the running body's stop source.
    pub fn stop_token(&self) -> StopToken {
        self.stop_source.token()
    }

    /// Wait for the thread to finish.
    pub fn join(&mut self) -> Result<(), ThreadError> {
        let handle = self.handle.take().ok_or_else(|| ThreadError::NotJoinable {
            name: self.name.clone(),
        })?;
        handle.join().map_err(|_| ThreadError::Panicked {
            name: self.name.clone(),
        })?;
        debug!(thread = %self.name, "thread joined");
        Ok(())
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.joinable() {
            self.request_stop();
            if let Err(e) = self.join() {
                warn!("{e}");
            }
        }
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("joinable", &self.joinable())
            .field("stop_requested", &self.stop_source.stop_requested())
            .finish()
    }
}

/// Apply affinity and scheduler settings to the calling thread.
///
/// No-op when the `rt` feature is not enabled.
pub fn apply_realtime_options(options: &ThreadOptions) -> Result<(), ThreadError> {
    if !options.cpu_affinity.is_empty() {
        rt_set_affinity(&options.cpu_affinity)?;
    }
    if let Some(priority) = options.realtime_priority {
        rt_set_scheduler(priority)?;
    }
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpus: &[usize]) -> Result<(), ThreadError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    for &cpu in cpus {
        cpuset
            .set(cpu)
            .map_err(|e| ThreadError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    }
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| ThreadError::RtSetup(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpus: &[usize]) -> Result<(), ThreadError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), ThreadError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // pid 0 targets the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(ThreadError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), ThreadError> {
    Ok(())
}
