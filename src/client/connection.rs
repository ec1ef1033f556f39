//! Connection actor
//!
//! One TCP connection to the relay server, driven by two background tasks:
//!
//! ```text
//!               requests (id + oneshot)
//!  handles ----------------------------.
//!     |                                v
//!     |  send()                 [pending table]
//!     v                                ^
//!  [writer task] --> socket --> [reader task] --> per-stream slots
//!     ^                                               (Data, orphaned)
//!     '-- unbounded queue, usable from Drop
//! ```
//!
//! The reader decodes incoming messages and routes them: responses complete
//! the oneshot registered under their request id, unsolicited messages
//! (`Data`, `Stream.orphaned`, `Relay.kick`) route by stream name to
//! [`StreamSlot`]s. The writer drains an unbounded queue so a handle's
//! `Drop` can still enqueue its close message without blocking.
//!
//! When either task stops the connection is marked closed: pending requests
//! fail, frame waiters wake, and later sends error out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Notify};

use crate::error::{ConnectionError, Error, Result};
use crate::frame::{DecodedFrame, Encoding, FrameAssembler, FrameProperties};
use crate::protocol::codec;
use crate::protocol::constants::*;
use crate::protocol::Message;

/// Per-stream receive state: chunk reassembly, the newest complete frame,
/// and the orphan flag.
///
/// The slot holds at most one complete frame. When a new frame completes
/// before the old one is taken, the old one's buffer goes back to the
/// assembler pool; the consumer always sees the latest frame.
#[derive(Debug)]
pub(crate) struct StreamSlot {
    state: Mutex<SlotState>,
    orphaned: AtomicBool,
    notify: Notify,
}

#[derive(Debug)]
struct SlotState {
    assembler: Option<FrameAssembler>,
    latest: Option<DecodedFrame>,
}

impl StreamSlot {
    fn new() -> Arc<StreamSlot> {
        Arc::new(StreamSlot {
            state: Mutex::new(SlotState {
                assembler: None,
                latest: None,
            }),
            orphaned: AtomicBool::new(false),
            notify: Notify::new(),
        })
    }

    /// Install a fresh assembler for the given encoding and geometry.
    ///
    /// Discards partial accumulation; a complete undelivered frame survives.
    pub(crate) fn arm(&self, encoding: Encoding, properties: FrameProperties) {
        let mut state = self.state.lock().unwrap();
        let stale = state
            .assembler
            .as_ref()
            .map(|a| a.properties() != properties)
            .unwrap_or(false);
        if stale {
            state.latest = None;
        }
        state.assembler = Some(FrameAssembler::new(encoding, properties));
    }

    /// Feed a payload chunk from the reader task.
    fn push_payload(&self, payload: &[u8]) {
        let completed = {
            let mut state = self.state.lock().unwrap();
            match state.assembler.as_mut() {
                Some(assembler) => match assembler.feed(payload) {
                    Some(frame) => {
                        if let Some(old) = state.latest.replace(frame) {
                            if let Some(assembler) = state.assembler.as_mut() {
                                assembler.recycle(old);
                            }
                        }
                        true
                    }
                    None => false,
                },
                None => false,
            }
        };

        if completed {
            self.notify.notify_one();
        }
    }

    /// Take the newest complete frame, if any.
    pub(crate) fn take_latest(&self) -> Option<DecodedFrame> {
        self.state.lock().unwrap().latest.take()
    }

    /// Hand a consumed frame's buffer back for reuse.
    pub(crate) fn recycle(&self, frame: DecodedFrame) {
        let mut state = self.state.lock().unwrap();
        if let Some(assembler) = state.assembler.as_mut() {
            assembler.recycle(frame);
        }
    }

    /// Wait for the next wake-up (new frame, orphan, or shutdown).
    ///
    /// At most one task waits on a slot (the stream handle, which pulls
    /// through `&mut self`). Wake-ups use `notify_one`, whose stored permit
    /// makes check-then-wait safe: an event landing between the check and
    /// the wait completes the wait immediately. Callers re-check state in a
    /// loop after waking.
    pub(crate) async fn wait(&self) {
        self.notify.notified().await;
    }

    pub(crate) fn is_orphaned(&self) -> bool {
        self.orphaned.load(Ordering::Acquire)
    }

    fn set_orphaned(&self) {
        self.orphaned.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    fn wake(&self) {
        self.notify.notify_one();
    }
}

#[derive(Debug)]
struct Pending {
    next_id: u16,
    waiters: HashMap<u16, oneshot::Sender<Message>>,
}

#[derive(Debug)]
struct Inner {
    write_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    pending: Mutex<Pending>,
    streams: Mutex<HashMap<String, Arc<StreamSlot>>>,
    closed: AtomicBool,
    shutdown_signal: Notify,
}

impl Inner {
    /// Mark the connection closed, fail pending requests, wake frame
    /// waiters, and release the writer so its queue drains and closes.
    ///
    /// Idempotent; both tasks call it on exit, and `disconnect` calls it
    /// to initiate teardown.
    fn shutdown(&self) {
        let (was_closed, waiters) = {
            let mut pending = self.pending.lock().unwrap();
            let was_closed = self.closed.swap(true, Ordering::AcqRel);
            (was_closed, std::mem::take(&mut pending.waiters))
        };

        // Dropping the senders fails the corresponding awaits
        drop(waiters);

        // Dropping the queue sender lets the write task drain and exit;
        // the signal pulls the read task out of its socket read
        self.write_tx.lock().unwrap().take();
        self.shutdown_signal.notify_one();

        let slots: Vec<Arc<StreamSlot>> = self.streams.lock().unwrap().values().cloned().collect();
        for slot in slots {
            slot.wake();
        }

        if !was_closed {
            tracing::debug!("Connection shut down");
        }
    }
}

/// Handle to a live server connection. Cheap to clone; the underlying
/// socket and tasks are shared.
#[derive(Debug, Clone)]
pub(crate) struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Take ownership of `io` and spawn the reader and writer tasks.
    pub(crate) fn establish<T>(io: T, read_buffer_size: usize) -> Connection
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(io);
        let (write_tx, write_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            write_tx: Mutex::new(Some(write_tx)),
            pending: Mutex::new(Pending {
                next_id: 0,
                waiters: HashMap::new(),
            }),
            streams: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            shutdown_signal: Notify::new(),
        });

        tokio::spawn(read_loop(Arc::clone(&inner), read_half, read_buffer_size));
        tokio::spawn(write_loop(Arc::clone(&inner), write_half, write_rx));

        Connection { inner }
    }

    /// Send `msg` as a request and await the matching response.
    pub(crate) async fn request(&self, mut msg: Message) -> Result<Message> {
        let rx = {
            let mut pending = self.inner.pending.lock().unwrap();
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(Error::Connection(ConnectionError::Closed));
            }

            let id = Self::alloc_id(&mut pending);
            let (tx, rx) = oneshot::channel();
            pending.waiters.insert(id, tx);
            msg.request_id = id;
            rx
        };

        let id = msg.request_id;
        if let Err(e) = self.send(msg) {
            self.inner.pending.lock().unwrap().waiters.remove(&id);
            return Err(e);
        }

        match rx.await {
            Ok(response) => Ok(response),
            Err(_) => Err(Error::Connection(ConnectionError::Closed)),
        }
    }

    /// Send a request whose response is a bare `Relay.response` code.
    pub(crate) async fn request_code(&self, msg: Message) -> Result<u16> {
        let response = self.request(msg).await?;
        Ok(response.response_code()?)
    }

    /// Queue a message without expecting a response.
    ///
    /// Synchronous, so `Drop` implementations can use it.
    pub(crate) fn send(&self, msg: Message) -> Result<()> {
        match self.inner.write_tx.lock().unwrap().as_ref() {
            Some(tx) => tx
                .send(msg)
                .map_err(|_| Error::Connection(ConnectionError::Closed)),
            None => Err(Error::Connection(ConnectionError::Closed)),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Tear the connection down.
    ///
    /// Messages already queued are still written before the socket shuts;
    /// pending requests fail and frame waiters wake immediately.
    pub(crate) fn disconnect(&self) {
        self.inner.shutdown();
    }

    /// Register a receive slot for a stream name.
    ///
    /// Must happen before the open request goes out, or an eager server
    /// could push frames into the void.
    pub(crate) fn register_stream(&self, name: &str) -> Arc<StreamSlot> {
        let slot = StreamSlot::new();
        self.inner
            .streams
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::clone(&slot));
        slot
    }

    pub(crate) fn unregister_stream(&self, name: &str) {
        self.inner.streams.lock().unwrap().remove(name);
    }

    fn alloc_id(pending: &mut Pending) -> u16 {
        loop {
            pending.next_id = pending.next_id.wrapping_add(1);
            if pending.next_id == UNSOLICITED_ID {
                continue;
            }
            if !pending.waiters.contains_key(&pending.next_id) {
                return pending.next_id;
            }
        }
    }
}

async fn read_loop<R>(inner: Arc<Inner>, mut io: R, buffer_size: usize)
where
    R: AsyncRead + Unpin + Send,
{
    let mut buf = BytesMut::with_capacity(buffer_size);

    loop {
        let next = tokio::select! {
            next = codec::read_message(&mut io, &mut buf) => next,
            _ = inner.shutdown_signal.notified() => break,
        };

        match next {
            Ok(Some(msg)) => {
                if msg.is_unsolicited() {
                    if !dispatch_push(&inner, msg) {
                        break;
                    }
                } else {
                    dispatch_response(&inner, msg);
                }
            }
            Ok(None) => {
                tracing::debug!("Server closed the connection");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "Receive from server failed");
                break;
            }
        }
    }

    inner.shutdown();
}

fn dispatch_response(inner: &Inner, msg: Message) {
    let waiter = inner
        .pending
        .lock()
        .unwrap()
        .waiters
        .remove(&msg.request_id);

    match waiter {
        // The receiver may be gone if the requester was cancelled
        Some(tx) => {
            let _ = tx.send(msg);
        }
        None => {
            tracing::debug!(
                request_id = msg.request_id,
                "Response with no waiting request"
            );
        }
    }
}

/// Route an unsolicited message. Returns false to terminate the connection.
fn dispatch_push(inner: &Inner, msg: Message) -> bool {
    match msg.verb() {
        Some(VERB_DATA) => {
            let Some(name) = msg.arg(1) else {
                tracing::warn!("Data message without a stream name");
                return true;
            };
            let slot = inner.streams.lock().unwrap().get(name).cloned();
            match slot {
                Some(slot) => slot.push_payload(&msg.payload),
                None => tracing::warn!(stream = name, "Data for unknown stream"),
            }
        }
        Some(VERB_STREAM_ORPHANED) => {
            let Some(name) = msg.arg(1) else {
                tracing::warn!("Orphan notice without a stream name");
                return true;
            };
            let slot = inner.streams.lock().unwrap().get(name).cloned();
            match slot {
                Some(slot) => {
                    tracing::info!(stream = name, "Stream orphaned by server");
                    slot.set_orphaned();
                }
                None => tracing::warn!(stream = name, "Orphan notice for unknown stream"),
            }
        }
        Some(VERB_KICK) => {
            tracing::warn!(
                reason = msg.arg(1).unwrap_or("none given"),
                "Kicked by server"
            );
            return false;
        }
        verb => {
            tracing::error!(verb = verb.unwrap_or(""), "Unsupported unsolicited message");
        }
    }
    true
}

async fn write_loop<W>(inner: Arc<Inner>, mut io: W, mut rx: mpsc::UnboundedReceiver<Message>)
where
    W: AsyncWrite + Unpin + Send,
{
    let mut scratch = BytesMut::new();

    // recv returns None once the sender is gone and the queue is drained,
    // so messages enqueued before a disconnect still go out
    while let Some(msg) = rx.recv().await {
        if let Err(e) = codec::write_message(&mut io, &mut scratch, &msg).await {
            tracing::error!(error = %e, "Send to server failed");
            break;
        }
    }

    let _ = io.shutdown().await;
    inner.shutdown();
}
