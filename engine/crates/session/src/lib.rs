use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use protocol::Frame;
use rand::RngCore;
use tokio::sync::mpsc;

mod inbox;

pub use inbox::{Inbox, MAXIMUM_QUEUED_MESSAGES};

/// Random 64-bit identity issued to a connection when it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(pub u64);

impl SessionKey {
    pub fn generate() -> Self {
        Self(rand::rngs::OsRng.next_u64())
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Instructions from the game side to the task that owns a connection's socket.
#[derive(Debug)]
pub enum Outbound {
    Frames(Vec<Frame>),
    /// Write `reply` with the login codec, then switch to the ciphered game
    /// codec seeded with the session keys.
    Upgrade { reply: Vec<Frame>, seed: [u32; 4] },
    Close,
}

/// Handle to one client connection.
///
/// Clones share the key, closed flag, inbox and outbound channel, but each
/// clone buffers its own unflushed writes. Once closed, every write and flush
/// is silently dropped.
#[derive(Debug)]
pub struct Session {
    key: SessionKey,
    remote: SocketAddr,
    closed: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Outbound>,
    inbox: Inbox,
    pending: Vec<Frame>,
}

impl Session {
    /// Creates a session and the receiver its connection task drains.
    pub fn new(remote: SocketAddr) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let session = Self {
            key: SessionKey::generate(),
            remote,
            closed: Arc::new(AtomicBool::new(false)),
            outbound,
            inbox: Inbox::default(),
            pending: Vec::new(),
        };
        (session, rx)
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Buffers a frame until the next [`Session::flush`].
    pub fn write(&mut self, frame: Frame) {
        if !self.is_closed() {
            self.pending.push(frame);
        }
    }

    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let frames = std::mem::take(&mut self.pending);
        if !self.is_closed() {
            let _ = self.outbound.send(Outbound::Frames(frames));
        }
    }

    pub fn write_and_flush(&mut self, frame: Frame) {
        self.write(frame);
        self.flush();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Sends a single frame immediately, bypassing the write buffer.
    pub fn send(&self, frame: Frame) {
        if !self.is_closed() {
            let _ = self.outbound.send(Outbound::Frames(vec![frame]));
        }
    }

    /// Sends `frame` and then closes the session.
    pub fn send_and_close(&self, frame: Frame) {
        self.send(frame);
        self.close();
    }

    /// Switches the connection to the game codec.
    ///
    /// Frames still buffered travel with the switch and are the last ones
    /// written unciphered.
    pub fn upgrade(&mut self, seed: [u32; 4]) {
        let reply = std::mem::take(&mut self.pending);
        if !self.is_closed() {
            let _ = self.outbound.send(Outbound::Upgrade { reply, seed });
        }
    }

    /// Closes the session. Only the first call has any effect.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(session = %self.key, remote = %self.remote, "session closed");
            let _ = self.outbound.send(Outbound::Close);
        }
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            remote: self.remote,
            closed: Arc::clone(&self.closed),
            outbound: self.outbound.clone(),
            inbox: self.inbox.clone(),
            pending: Vec::new(),
        }
    }
}
