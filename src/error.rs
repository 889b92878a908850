use thiserror::Error;

/// Errors arising from wire protocol parsing and encoding.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("frame too short ({len} bytes, minimum 4)")]
    FrameTooShort { len: usize },

    #[error("bad preamble (expected FF FF, got {b0:02X} {b1:02X})")]
    BadPreamble { b0: u8, b1: u8 },

    #[error("checksum mismatch (expected 0x{expected:02X}, computed 0x{computed:02X})")]
    BadChecksum { expected: u8, computed: u8 },

    #[error("unknown variant advertising prefix: {0:?}")]
    UnknownVariant(String),

    #[error("unknown joint label {0:?} for this variant")]
    UnknownJoint(String),

    #[error("payload too short for {msg_type}: need {need} bytes, got {got}{}", format_raw_suffix(raw))]
    PayloadTooShort {
        msg_type: &'static str,
        need: usize,
        got: usize,
        /// Raw payload bytes for debug context.
        raw: Vec<u8>,
    },

    #[error("unexpected payload length for {msg_type}: expected {expected}, got {got}{}", format_raw_suffix(raw))]
    UnexpectedLength {
        msg_type: &'static str,
        expected: usize,
        got: usize,
        raw: Vec<u8>,
    },

    #[error("invalid ASCII payload: {0}")]
    InvalidAscii(#[from] std::string::FromUtf8Error),
}

impl WireError {
    /// Create a `PayloadTooShort` error (raw bytes filled in later via `with_raw`).
    pub(crate) fn payload_too_short(msg_type: &'static str, need: usize, got: usize) -> Self {
        Self::PayloadTooShort { msg_type, need, got, raw: Vec::new() }
    }

    /// Create an `UnexpectedLength` error (raw bytes filled in later via `with_raw`).
    pub(crate) fn unexpected_length(msg_type: &'static str, expected: usize, got: usize) -> Self {
        Self::UnexpectedLength { msg_type, expected, got, raw: Vec::new() }
    }

    /// Attach raw payload bytes to decode-phase errors for diagnostics.
    pub fn with_raw(self, payload: &[u8]) -> Self {
        match self {
            Self::PayloadTooShort { msg_type, need, got, .. } => {
                Self::PayloadTooShort { msg_type, need, got, raw: payload.to_vec() }
            }
            Self::UnexpectedLength { msg_type, expected, got, .. } => {
                Self::UnexpectedLength { msg_type, expected, got, raw: payload.to_vec() }
            }
            other => other,
        }
    }
}

/// Format raw bytes as a suffix like " | 9E 00 03 ..." (empty if no bytes).
fn format_raw_suffix(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let limit = 16;
    let hex: String = raw.iter().take(limit).map(|b| format!("{b:02X}")).collect();
    let ellipsis = if raw.len() > limit { "..." } else { "" };
    format!(" | {hex}{ellipsis}")
}

pub type Result<T> = std::result::Result<T, WireError>;

/// Errors from session/transport operations (layered above [`WireError`]).
#[derive(Debug)]
pub enum SessionError {
    /// Transport I/O error (connect/write/subscribe failed).
    Transport(std::io::Error),
    /// Wire protocol decode error.
    Wire(WireError),
    /// A blocking receive exceeded its deadline.
    Timeout { timeout: std::time::Duration },
    /// The link closed from the peer side.
    Disconnected,
    /// A user intent was rejected by the state machine in its current state.
    Inadmissible { intent: &'static str },
    /// A SET_POSITION-class command was attempted before the programming
    /// handshake learned per-joint biases.
    BiasNotLearned,
    /// Unexpected message during a sequenced exchange (e.g. startup probe).
    Protocol(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Transport(e) => write!(f, "transport error: {e}"),
            SessionError::Wire(e) => write!(f, "wire error: {e}"),
            SessionError::Timeout { timeout } => write!(f, "recv timed out after {timeout:?}"),
            SessionError::Disconnected => write!(f, "connection closed by device"),
            SessionError::Inadmissible { intent } => {
                write!(f, "{intent} is not admissible in the current state")
            }
            SessionError::BiasNotLearned => {
                write!(f, "bias table not learned (run enter_programming first)")
            }
            SessionError::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Transport(e) => Some(e),
            SessionError::Wire(e) => Some(e),
            SessionError::Timeout { .. }
            | SessionError::Disconnected
            | SessionError::Inadmissible { .. }
            | SessionError::BiasNotLearned
            | SessionError::Protocol(_) => None,
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Transport(e)
    }
}

impl From<WireError> for SessionError {
    fn from(e: WireError) -> Self {
        SessionError::Wire(e)
    }
}
