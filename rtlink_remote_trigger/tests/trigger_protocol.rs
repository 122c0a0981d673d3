//! Remote trigger protocol tests.
//!
//! The server side is either a `RemoteTriggerServer` or a bare peer that posts
//! the response primitive by hand, so client-observable behavior can be
//! checked step by step. One test uses `fork()` to run the client in a
//! separate process.

use rtlink_common::error::ErrorKind;
use rtlink_remote_trigger::{
    RemoteTriggerClient, RemoteTriggerServer, TriggerError, TriggerResult, TriggerServerOptions,
};
use rtlink_shared_memory::{
    BinaryFutex, ReadOnlySegment, ReadWriteSegment, SegmentName, SharedMemoryManager,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

fn server_name(tag: &str) -> SegmentName {
    SegmentName::new("", &format!("trig_{}", std::process::id()), tag).unwrap()
}

/// Server registered but not answering; the test plays the server by hand.
struct ManualPeer {
    _manager: SharedMemoryManager,
    _server: RemoteTriggerServer,
    request: ReadOnlySegment<BinaryFutex>,
    response: ReadWriteSegment<BinaryFutex>,
}

impl ManualPeer {
    fn new(name: &SegmentName) -> Self {
        let manager = SharedMemoryManager::new();
        let server = RemoteTriggerServer::create(&manager, name.clone(), || {}).unwrap();
        Self {
            request: ReadOnlySegment::attach(&name.with_suffix("_req")).unwrap(),
            response: ReadWriteSegment::attach(&name.with_suffix("_resp")).unwrap(),
            _manager: manager,
            _server: server,
        }
    }

    fn requests(&self) -> u32 {
        self.request.get().value()
    }

    fn respond(&self) {
        self.response.get().post().unwrap();
    }
}

fn soon() -> Instant {
    Instant::now() + Duration::from_secs(1)
}

#[test]
fn disconnected_trigger_is_rejected_without_touching_primitives() {
    let name = server_name("disconnected");
    let peer = ManualPeer::new(&name);
    let client = RemoteTriggerClient::create(name, false).unwrap();
    assert!(!client.is_connected());

    let err = client.trigger(soon()).unwrap_err();
    assert!(matches!(err, TriggerError::NotConnected { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(client.trigger_async().is_err());
    assert_eq!(peer.requests(), 0);
}

#[test]
fn connect_is_lazy_and_idempotent() {
    let name = server_name("lazy");
    let err = RemoteTriggerClient::create(name.clone(), true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let mut client = RemoteTriggerClient::create(name.clone(), false).unwrap();
    assert_eq!(client.connect().unwrap_err().kind(), ErrorKind::NotFound);

    let _peer = ManualPeer::new(&name);
    client.connect().unwrap();
    client.connect().unwrap();
    assert!(client.is_connected());
    assert_eq!(client.server_name(), &name);
}

#[test]
fn past_deadline_never_posts_request() {
    let name = server_name("past");
    let peer = ManualPeer::new(&name);
    let client = RemoteTriggerClient::create(name, true).unwrap();

    let err = client
        .trigger(Instant::now() - Duration::from_millis(1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert_eq!(peer.requests(), 0);

    // The pending flag was never claimed.
    let request = client.trigger_async().unwrap();
    assert!(request.valid());
}

#[test]
fn second_async_trigger_is_rejected_and_first_stays_completable() {
    let name = server_name("single");
    let peer = ManualPeer::new(&name);
    let client = RemoteTriggerClient::create(name, true).unwrap();

    let mut first = client.trigger_async().unwrap();
    let err = client.trigger_async().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(
        client.trigger(soon()).unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );
    assert_eq!(peer.requests(), 1);

    assert!(first.valid());
    peer.respond();
    first.wait_until(soon()).unwrap();
    assert!(!first.valid());
}

#[test]
fn async_request_sees_response_before_waiting() {
    let name = server_name("ready");
    let peer = ManualPeer::new(&name);
    let client = RemoteTriggerClient::create(name, true).unwrap();

    let mut request = client.trigger_async().unwrap();
    assert!(request.valid());
    assert!(!request.ready());
    assert_eq!(peer.requests(), 1);

    peer.respond();
    assert!(request.ready());
    assert!(request.valid());

    request.wait_until(soon()).unwrap();
    assert!(!request.valid());

    let err = request.wait_until(soon()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
}

#[test]
fn dropping_async_request_releases_client() {
    let name = server_name("abandon");
    let peer = ManualPeer::new(&name);
    let client = RemoteTriggerClient::create(name, true).unwrap();

    drop(client.trigger_async().unwrap());

    // Answer the next request from another thread.
    let (request, response) = (&peer.request, &peer.response);
    let responder = std::thread::scope(|scope| {
        let handle = scope.spawn(move || {
            let deadline = soon();
            while request.get().value() < 2 && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(1));
            }
            response.get().post().unwrap();
        });
        let result = client.trigger(soon());
        handle.join().unwrap();
        result
    });
    responder.unwrap();
}

#[test]
fn timed_out_trigger_releases_pending_flag() {
    let name = server_name("timeout");
    let _peer = ManualPeer::new(&name);
    let client = RemoteTriggerClient::create(name, true).unwrap();

    let err = client
        .trigger(Instant::now() + Duration::from_millis(20))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);

    let mut request = client.trigger_async().unwrap();
    let err = request
        .wait_until(Instant::now() + Duration::from_millis(5))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert!(!request.valid());
}

#[test]
fn query_handles_one_request() {
    let name = server_name("query");
    let manager = SharedMemoryManager::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut server = RemoteTriggerServer::create(&manager, name.clone(), move || {
        counter.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    assert!(!server.query(Instant::now() + Duration::from_millis(5)).unwrap());

    let client = RemoteTriggerClient::create(name, true).unwrap();
    let mut request = client.trigger_async().unwrap();
    assert!(server.query(soon()).unwrap());
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert!(request.ready());
    request.wait_until(soon()).unwrap();
}

#[test]
fn running_server_answers_round_trips_and_stops() {
    let name = server_name("running");
    let manager = SharedMemoryManager::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let running = RemoteTriggerServer::create(&manager, name.clone(), move || {
        counter.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap()
    .start(&TriggerServerOptions::default())
    .unwrap();
    assert!(running.is_running());
    assert_eq!(running.server_name(), &name);

    let client = RemoteTriggerClient::create(name, true).unwrap();
    for _ in 0..5 {
        client.trigger(soon()).unwrap();
    }
    assert_eq!(calls.load(Ordering::Relaxed), 5);

    let stop_started = Instant::now();
    running.stop().unwrap();
    assert!(stop_started.elapsed() < Duration::from_millis(500));
}

#[test]
fn duplicate_server_name_is_rejected() {
    let name = server_name("duplicate");
    let manager = SharedMemoryManager::new();
    let _first = RemoteTriggerServer::create(&manager, name.clone(), || {}).unwrap();
    let err = RemoteTriggerServer::create(&manager, name, || {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

fn trigger_from_child(name: &SegmentName, rounds: usize) -> TriggerResult<()> {
    let client = RemoteTriggerClient::create(name.clone(), true)?;
    for _ in 0..rounds {
        client.trigger(Instant::now() + Duration::from_secs(2))?;
    }
    Ok(())
}

#[test]
fn round_trips_across_processes() {
    const ROUNDS: usize = 3;
    let name = server_name("forked");
    let manager = SharedMemoryManager::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut server = RemoteTriggerServer::create(&manager, name.clone(), move || {
        counter.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    // Safety: fork() is unsafe but this is a controlled test environment.
    let pid = unsafe { libc::fork() };

    if pid == 0 {
        // ── CHILD PROCESS (client) ──
        let code = match trigger_from_child(&name, ROUNDS) {
            Ok(()) => 0,
            Err(_) => 1,
        };
        // _exit skips destructors; the parent owns the segments.
        unsafe { libc::_exit(code) };
    }

    // ── PARENT PROCESS (server) ──
    assert!(pid > 0, "fork failed");

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut served = 0;
    while served < ROUNDS && Instant::now() < deadline {
        if server
            .query(Instant::now() + Duration::from_millis(50))
            .unwrap()
        {
            served += 1;
        }
    }

    let mut status: libc::c_int = 0;
    unsafe {
        libc::waitpid(pid, &mut status, 0);
    }

    assert_eq!(served, ROUNDS);
    assert_eq!(calls.load(Ordering::Relaxed), ROUNDS);
    assert!(libc::WIFEXITED(status), "client process did not exit normally");
    assert_eq!(libc::WEXITSTATUS(status), 0, "client process reported an error");
}
