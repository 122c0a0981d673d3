//! Trigger client.
//!
//! A client posts the server's request primitive and waits on its response
//! primitive. At most one request per client is outstanding; the
//! `request_started` flag is claimed with a compare-and-set and released on
//! every exit path.

use crate::error::{TriggerError, TriggerResult};
use rtlink_common::consts::{TRIGGER_REQUEST_SUFFIX, TRIGGER_RESPONSE_SUFFIX};
use rtlink_shared_memory::{BinaryFutex, ReadOnlySegment, ReadWriteSegment, SegmentName};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::debug;

/// Client side of a remote trigger pair.
#[derive(Debug)]
pub struct RemoteTriggerClient {
    server_name: SegmentName,
    request: Option<ReadWriteSegment<BinaryFutex>>,
    response: Option<ReadOnlySegment<BinaryFutex>>,
    request_started: AtomicBool,
}

impl RemoteTriggerClient {
    /// Client for the server called `server_name`; connects at once if
    /// `auto_connect` is set.
    pub fn create(server_name: SegmentName, auto_connect: bool) -> TriggerResult<Self> {
        let mut client = Self {
            server_name,
            request: None,
            response: None,
            request_started: AtomicBool::new(false),
        };
        if auto_connect {
            client.connect()?;
        }
        Ok(client)
    }

    /// Attach the server's request and response primitives. No-op when
    /// already connected.
    pub fn connect(&mut self) -> TriggerResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let request = ReadWriteSegment::attach(&self.server_name.with_suffix(TRIGGER_REQUEST_SUFFIX))?;
        let response =
            ReadOnlySegment::attach(&self.server_name.with_suffix(TRIGGER_RESPONSE_SUFFIX))?;
        self.request = Some(request);
        self.response = Some(response);
        debug!(server = %self.server_name, "trigger client connected");
        Ok(())
    }

    /// Whether both primitives are attached.
    pub fn is_connected(&self) -> bool {
        self.request.is_some() && self.response.is_some()
    }

    /// Server base name.
    pub fn server_name(&self) -> &SegmentName {
        &self.server_name
    }

    /// Trigger the server and block until it responds or `deadline` passes.
    ///
    /// A deadline already in the past fails without posting a request.
    pub fn trigger(&self, deadline: Instant) -> TriggerResult<()> {
        let (request, response) = self.primitives()?;
        if Instant::now() > deadline {
            return Err(TriggerError::DeadlineExceeded {
                server: self.server_name.to_string(),
            });
        }

        self.claim_request()?;
        let _release = ReleaseOnDrop(&self.request_started);
        request.get().post()?;
        response.get().wait_until(deadline)?;
        Ok(())
    }

    /// Trigger the server and return without waiting for the response.
    pub fn trigger_async(&self) -> TriggerResult<AsyncRequest<'_>> {
        let (request, response) = self.primitives()?;
        self.claim_request()?;
        if let Err(e) = request.get().post() {
            self.request_started.store(false, Ordering::Release);
            return Err(e.into());
        }
        Ok(AsyncRequest {
            response: response.get(),
            request_started: Some(&self.request_started),
        })
    }

    fn primitives(
        &self,
    ) -> TriggerResult<(&ReadWriteSegment<BinaryFutex>, &ReadOnlySegment<BinaryFutex>)> {
        match (&self.request, &self.response) {
            (Some(request), Some(response)) => Ok((request, response)),
            _ => Err(TriggerError::NotConnected {
                server: self.server_name.to_string(),
            }),
        }
    }

    fn claim_request(&self) -> TriggerResult<()> {
        self.request_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| TriggerError::AlreadyTriggered {
                server: self.server_name.to_string(),
            })
    }
}

struct ReleaseOnDrop<'a>(&'a AtomicBool);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Outstanding request returned by [`RemoteTriggerClient::trigger_async`].
///
/// Releases the client's pending flag exactly once: in
/// [`wait_until`](Self::wait_until), or on drop if never waited on.
#[derive(Debug)]
pub struct AsyncRequest<'a> {
    response: &'a BinaryFutex,
    request_started: Option<&'a AtomicBool>,
}

impl AsyncRequest<'_> {
    /// Whether the request is still outstanding.
    pub fn valid(&self) -> bool {
        self.request_started
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Whether the response has arrived. Does not consume it.
    pub fn ready(&self) -> bool {
        self.response.value() > 0
    }

    /// Wait for the response, then release the client's pending flag.
    ///
    /// The flag is released and the request invalidated whether or not the
    /// response arrived before `deadline`.
    pub fn wait_until(&mut self, deadline: Instant) -> TriggerResult<()> {
        if !self.valid() {
            return Err(TriggerError::RequestNoLongerValid);
        }
        let result = self.response.wait_until(deadline);
        if let Some(flag) = self.request_started.take() {
            flag.store(false, Ordering::Release);
        }
        Ok(result?)
    }
}

impl Drop for AsyncRequest<'_> {
    fn drop(&mut self) {
        if let Some(flag) = self.request_started.take() {
            flag.store(false, Ordering::Release);
        }
    }
}
