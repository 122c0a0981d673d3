//! Trigger server.
//!
//! The server registers the request and response primitives in the caller's
//! [`SharedMemoryManager`], waits on the request primitive, runs its callback
//! and posts the response primitive. [`RemoteTriggerServer::start`] runs that
//! loop on its own thread until stopped.

use crate::error::TriggerResult;
use rtlink_common::config::HardwareModuleConfig;
use rtlink_common::consts::{
    DEFAULT_TRIGGER_POLL_INTERVAL_MS, TRIGGER_REQUEST_SUFFIX, TRIGGER_RESPONSE_SUFFIX,
};
use rtlink_common::error::ErrorKind;
use rtlink_common::thread::{Thread, ThreadOptions};
use rtlink_shared_memory::{
    BinaryFutex, ReadOnlySegment, ReadWriteSegment, SegmentName, SharedMemoryManager,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Settings of a running server loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerServerOptions {
    /// Thread the loop runs on.
    pub thread: ThreadOptions,
    /// Longest single wait on the request primitive; bounds stop latency.
    pub poll_interval: Duration,
}

impl Default for TriggerServerOptions {
    fn default() -> Self {
        Self {
            thread: ThreadOptions::default(),
            poll_interval: Duration::from_millis(DEFAULT_TRIGGER_POLL_INTERVAL_MS),
        }
    }
}

impl TriggerServerOptions {
    /// Options for a server thread called `thread_name`, taking the poll
    /// interval and real-time settings from `config`.
    pub fn from_config(config: &HardwareModuleConfig, thread_name: &str) -> Self {
        Self {
            thread: config.thread_options(thread_name),
            poll_interval: config.trigger_poll_interval(),
        }
    }
}

type Callback = Box<dyn FnMut() + Send + 'static>;

/// Server side of a remote trigger pair.
pub struct RemoteTriggerServer {
    server_name: SegmentName,
    request: ReadOnlySegment<BinaryFutex>,
    response: ReadWriteSegment<BinaryFutex>,
    callback: Callback,
}

impl RemoteTriggerServer {
    /// Register the trigger pair for `server_name` in `manager` and attach it.
    ///
    /// `callback` runs once per received request.
    pub fn create<F>(
        manager: &SharedMemoryManager,
        server_name: SegmentName,
        callback: F,
    ) -> TriggerResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let request_name = server_name.with_suffix(TRIGGER_REQUEST_SUFFIX);
        let response_name = server_name.with_suffix(TRIGGER_RESPONSE_SUFFIX);
        manager.add_segment_with_default::<BinaryFutex>(&request_name, false)?;
        manager.add_segment_with_default::<BinaryFutex>(&response_name, false)?;

        let request = ReadOnlySegment::attach(&request_name)?;
        let response = ReadWriteSegment::attach(&response_name)?;
        info!(server = %server_name, "trigger server created");
        Ok(Self {
            server_name,
            request,
            response,
            callback: Box::new(callback),
        })
    }

    /// Server base name.
    pub fn server_name(&self) -> &SegmentName {
        &self.server_name
    }

    /// Handle at most one request, waiting for it until `deadline`.
    ///
    /// Returns `Ok(false)` if no request arrived in time.
    pub fn query(&mut self, deadline: Instant) -> TriggerResult<bool> {
        match self.request.get().wait_until(deadline) {
            Ok(()) => {
                (self.callback)();
                self.response.get().post()?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::DeadlineExceeded => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Run the request loop on a new thread.
    pub fn start(mut self, options: &TriggerServerOptions) -> TriggerResult<RunningTriggerServer> {
        let server_name = self.server_name.clone();
        let poll_interval = options.poll_interval;
        let mut thread_options = options.thread.clone();
        if thread_options.name.is_none() {
            thread_options.name = Some("rtlink-trigger".to_string());
        }

        let thread = Thread::spawn(&thread_options, move |token| {
            debug!(server = %self.server_name, "trigger server loop started");
            while !token.stop_requested() {
                if let Err(e) = self.query(Instant::now() + poll_interval) {
                    warn!(server = %self.server_name, "trigger query failed: {e}");
                    std::thread::sleep(poll_interval);
                }
            }
            debug!(server = %self.server_name, "trigger server loop stopped");
        })?;

        Ok(RunningTriggerServer {
            server_name,
            thread,
        })
    }
}

impl std::fmt::Debug for RemoteTriggerServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTriggerServer")
            .field("server_name", &self.server_name)
            .field("pending_requests", &self.request.get().value())
            .finish()
    }
}

/// A server loop running on its own thread. Dropping it stops the loop.
#[derive(Debug)]
pub struct RunningTriggerServer {
    server_name: SegmentName,
    thread: Thread,
}

impl RunningTriggerServer {
    /// Server base name.
    pub fn server_name(&self) -> &SegmentName {
        &self.server_name
    }

    /// Whether the loop thread has not been joined yet.
    pub fn is_running(&self) -> bool {
        self.thread.joinable()
    }

    /// Request the loop to stop and wait for it.
    pub fn stop(mut self) -> TriggerResult<()> {
        self.thread.request_stop();
        self.thread.join()?;
        info!(server = %self.server_name, "trigger server stopped");
        Ok(())
    }
}
