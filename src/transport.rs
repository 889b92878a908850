//! Synchronous BLE transport: one GATT characteristic used for both
//! write-without-response commands and notify-based responses.
//!
//! No concrete BLE stack is bundled here — callers implement [`Transport`]
//! against whatever platform BLE library fits (btleplug, a vendor SDK, or a
//! mock for tests). [`BleLink`] then layers frame splitting, decode, and
//! deadline-based receive on top, the same shape as a direct-socket
//! connection type but generic over the transport.

use std::fmt;
use std::io;
use std::time::{Duration, Instant};

use crate::error::{SessionError, WireError};
use crate::frame::{FrameSplitter, RawFrame};
use crate::protocol::{Command, Message};

/// A BLE link capable of writing to the command characteristic and
/// delivering bytes received via notification.
///
/// Implementations are expected to be non-blocking-ish: `recv_timeout`
/// should return `Ok(None)` promptly once `timeout` elapses rather than
/// blocking indefinitely, since the session controller relies on deadline
/// arithmetic across several calls.
pub trait Transport {
    /// Write one already-framed command (including preamble and checksum).
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Block up to `timeout` for the next chunk of notification bytes.
    /// Returns `Ok(None)` on timeout, `Ok(Some(bytes))` on data, `Err` on a
    /// fatal transport error (the peer disconnecting is reported as an I/O
    /// error on the next call, not as an `Ok(None)`).
    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>>;
}

/// A decoded inbound message with its raw opcode and payload for debugging.
#[derive(Clone)]
pub struct Envelope {
    pub opcode: u8,
    pub raw: Vec<u8>,
    pub message: Message,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} [0x{:02X} {}B", self.message, self.opcode, self.raw.len())?;
        if !self.raw.is_empty() {
            write!(f, " | ")?;
            for b in &self.raw {
                write!(f, "{b:02X}")?;
            }
        }
        write!(f, "]")
    }
}

/// Frame splitting, decode, and deadline-based receive layered over a raw
/// [`Transport`]. Synchronous and single-threaded — callers drive timing.
pub struct BleLink<T: Transport> {
    transport: T,
    splitter: FrameSplitter,
    pending: Vec<RawFrame>,
    on_send: Option<Box<dyn FnMut(&Command)>>,
    on_recv: Option<Box<dyn FnMut(&Envelope)>>,
}

impl<T: Transport> BleLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            splitter: FrameSplitter::new(),
            pending: Vec::new(),
            on_send: None,
            on_recv: None,
        }
    }

    /// Register a callback invoked at the top of every [`send()`](Self::send) call.
    pub fn set_on_send(&mut self, f: impl FnMut(&Command) + 'static) {
        self.on_send = Some(Box::new(f));
    }

    /// Register a callback invoked after every successful frame decode.
    pub fn set_on_recv(&mut self, f: impl FnMut(&Envelope) + 'static) {
        self.on_recv = Some(Box::new(f));
    }

    pub fn send(&mut self, cmd: &Command) -> Result<(), SessionError> {
        if let Some(cb) = self.on_send.as_mut() {
            cb(cmd);
        }
        self.send_raw(&cmd.encode())
    }

    /// Send a pre-built raw frame (used by callers bypassing [`Command`]).
    pub fn send_raw(&mut self, frame: &RawFrame) -> Result<(), SessionError> {
        let wire = frame.encode();
        self.transport.write(&wire)?;
        Ok(())
    }

    /// Block up to `timeout` for the next complete, decodable frame.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Envelope, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.pending.pop() {
                return self.finish_decode(frame);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::Timeout { timeout });
            }
            match self.transport.recv_timeout(remaining)? {
                None => return Err(SessionError::Timeout { timeout }),
                Some(bytes) => {
                    let mut frames = self.splitter.feed(&bytes);
                    if let Some(first) = frames.first().cloned() {
                        frames.remove(0);
                        self.pending.extend(frames.into_iter().rev());
                        return self.finish_decode(first);
                    }
                    // No complete frame yet — loop for more notification data.
                }
            }
        }
    }

    fn finish_decode(&mut self, frame: RawFrame) -> Result<Envelope, SessionError> {
        let raw = frame.payload.clone();
        let message = Message::decode(&frame)
            .map_err(|e: WireError| SessionError::Wire(e.with_raw(&raw)))?;
        let env = Envelope { opcode: frame.opcode, raw, message };
        if let Some(cb) = self.on_recv.as_mut() {
            cb(&env);
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// An in-memory transport for tests: a queue of outbound writes observed
    /// by the test, and a queue of inbound notification chunks to replay.
    struct MockTransport {
        sent: Vec<u8>,
        inbound: VecDeque<Vec<u8>>,
    }

    impl Transport for MockTransport {
        fn write(&mut self, data: &[u8]) -> io::Result<()> {
            self.sent.extend_from_slice(data);
            Ok(())
        }

        fn recv_timeout(&mut self, _timeout: Duration) -> io::Result<Option<Vec<u8>>> {
            Ok(self.inbound.pop_front())
        }
    }

    #[test]
    fn send_writes_encoded_command() {
        let mut link = BleLink::new(MockTransport { sent: Vec::new(), inbound: VecDeque::new() });
        link.send(&Command::GetState).unwrap();
        assert_eq!(link.transport.sent, vec![0xFF, 0xFF, 0x02, 0x0F, 0x11]);
    }

    #[test]
    fn recv_timeout_decodes_queued_notification() {
        let wire = crate::frame::encode(crate::protocol::OP_ACTION_COMPLETE, &[]);
        let mut link = BleLink::new(MockTransport { sent: Vec::new(), inbound: VecDeque::from([wire]) });
        let env = link.recv_timeout(Duration::from_millis(10)).unwrap();
        assert!(matches!(env.message, Message::ActionComplete));
    }

    #[test]
    fn recv_timeout_reports_timeout_on_silence() {
        let mut link = BleLink::new(MockTransport { sent: Vec::new(), inbound: VecDeque::new() });
        let err = link.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, SessionError::Timeout { .. }));
    }

    #[test]
    fn recv_timeout_splits_coalesced_notifications_across_calls() {
        let mut combined = crate::frame::encode(crate::protocol::OP_ACTION_COMPLETE, &[]);
        combined.extend_from_slice(&crate::frame::encode(crate::protocol::OP_EXIT_PROGRAMMING, &[]));
        let mut link = BleLink::new(MockTransport { sent: Vec::new(), inbound: VecDeque::from([combined]) });
        let first = link.recv_timeout(Duration::from_millis(10)).unwrap();
        assert!(matches!(first.message, Message::ActionComplete));
        let second = link.recv_timeout(Duration::from_millis(10)).unwrap();
        assert!(matches!(second.message, Message::ExitProgramming));
    }
}
