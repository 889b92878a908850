//! Opcode dictionary and decode/encode dispatch.
//!
//! - [`Command`] — messages we send to the robot (controller → device)
//! - [`Message`] — messages the robot sends back (device → controller)
//!
//! ## Versioned Enum Pattern
//!
//! GET_STATE's payload shape varies by firmware revision. The pattern:
//!
//! 1. Top-level type is an **enum** ([`status::GetState`]), not a struct.
//! 2. Each wire format gets a **variant struct** (`GetStateShort`, `GetStateLong`).
//! 3. `decode()` dispatches on payload length.
//! 4. Helper methods on the enum delegate to variants, so callers never
//!    match on variants directly.
//!
//! Reference: [`status::GetState`].

pub mod status;

use crate::error::{Result, WireError};
use crate::frame::RawFrame;
use crate::joints::NUM_SLOTS;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_FORWARD: u8 = 1;
pub const OP_TURN_RIGHT: u8 = 2;
pub const OP_STEP_RIGHT: u8 = 3;
pub const OP_REVERSE_RIGHT: u8 = 4;
pub const OP_REVERSE: u8 = 5;
pub const OP_REVERSE_LEFT: u8 = 6;
pub const OP_STEP_LEFT: u8 = 7;
pub const OP_TURN_LEFT: u8 = 8;
pub const OP_BUILT_IN_ACTION: u8 = 9;
pub const OP_TRANSFORM: u8 = 10;
pub const OP_ACTION_COMPLETE: u8 = 11;
pub const OP_STOP: u8 = 12;
pub const OP_GET_STATE: u8 = 15;
pub const OP_ACTION_PROGRESS: u8 = 17;
pub const OP_READ_DIRECTORY: u8 = 22;
pub const OP_EXECUTE_FILE: u8 = 23;
pub const OP_ENTER_PROGRAMMING: u8 = 230;
pub const OP_EXIT_PROGRAMMING: u8 = 231;
pub const OP_SET_POSITION: u8 = 232;
pub const OP_GET_POSITION: u8 = 233;
pub const OP_UNLOCK_ALL: u8 = 234;
pub const OP_LOCK_ALL: u8 = 235;
pub const OP_LOCKS: u8 = 237;
pub const OP_SERIAL_NUMBER: u8 = 241;
pub const OP_ENTER_USB_MODE: u8 = 245;
pub const OP_MODEL: u8 = 246;
pub const OP_VERSION: u8 = 247;
pub const OP_FIRMWARE_DATE: u8 = 248;
pub const OP_SHUTDOWN: u8 = 250;

// ---------------------------------------------------------------------------
// Command — messages we send to the robot
// ---------------------------------------------------------------------------

/// A message we send to the robot.
#[derive(Debug, Clone)]
pub enum Command {
    Forward,
    TurnRight,
    StepRight,
    ReverseRight,
    Reverse,
    ReverseLeft,
    StepLeft,
    TurnLeft,
    /// Scripted built-in action: 1-byte action id, or 2 bytes for the
    /// speed-toggle subtype (`[3, 0|1]`).
    BuiltInAction(Vec<u8>),
    Transform,
    /// Startup keepalive; also echoed back on completion of an action.
    ActionComplete,
    Stop,
    GetState,
    ReadDirectory(String),
    ExecuteFile(String),
    /// `vehicle = false` requests the humanoid-form handshake payload.
    EnterProgramming { vehicle: bool },
    ExitProgramming,
    SetPosition([u8; NUM_SLOTS + 1]),
    GetPosition,
    UnlockAll,
    LockAll,
    Locks([u8; NUM_SLOTS]),
    SerialNumber,
    EnterUsbMode,
    Model,
    Version,
    FirmwareDate,
    Shutdown,
}

impl Command {
    /// Format as a hex debug line: `"-> 0xE8 01B | 01"`.
    pub fn debug_hex(&self) -> String {
        let frame = self.encode();
        let mut s = format!("-> 0x{:02X} {}B", frame.opcode, frame.payload.len());
        if !frame.payload.is_empty() {
            s.push_str(" | ");
            let limit = 20;
            for b in frame.payload.iter().take(limit) {
                s.push_str(&format!("{b:02X}"));
            }
            if frame.payload.len() > limit {
                s.push_str("...");
            }
        }
        s
    }

    /// Encode into a `RawFrame` ready for wire transmission.
    pub fn encode(&self) -> RawFrame {
        let (opcode, payload) = match self {
            Command::Forward => (OP_FORWARD, vec![]),
            Command::TurnRight => (OP_TURN_RIGHT, vec![]),
            Command::StepRight => (OP_STEP_RIGHT, vec![]),
            Command::ReverseRight => (OP_REVERSE_RIGHT, vec![]),
            Command::Reverse => (OP_REVERSE, vec![]),
            Command::ReverseLeft => (OP_REVERSE_LEFT, vec![]),
            Command::StepLeft => (OP_STEP_LEFT, vec![]),
            Command::TurnLeft => (OP_TURN_LEFT, vec![]),
            Command::BuiltInAction(ids) => (OP_BUILT_IN_ACTION, ids.clone()),
            Command::Transform => (OP_TRANSFORM, vec![0]),
            Command::ActionComplete => (OP_ACTION_COMPLETE, vec![]),
            Command::Stop => (OP_STOP, vec![]),
            Command::GetState => (OP_GET_STATE, vec![]),
            Command::ReadDirectory(path) => (OP_READ_DIRECTORY, status::Text { text: path.clone() }.encode()),
            Command::ExecuteFile(path) => (OP_EXECUTE_FILE, status::Text { text: path.clone() }.encode()),
            Command::EnterProgramming { vehicle } => (OP_ENTER_PROGRAMMING, vec![u8::from(*vehicle)]),
            Command::ExitProgramming => (OP_EXIT_PROGRAMMING, vec![]),
            Command::SetPosition(frame) => (OP_SET_POSITION, frame.to_vec()),
            Command::GetPosition => (OP_GET_POSITION, vec![]),
            Command::UnlockAll => (OP_UNLOCK_ALL, vec![]),
            Command::LockAll => (OP_LOCK_ALL, vec![]),
            Command::Locks(frame) => (OP_LOCKS, frame.to_vec()),
            Command::SerialNumber => (OP_SERIAL_NUMBER, vec![]),
            Command::EnterUsbMode => (OP_ENTER_USB_MODE, vec![]),
            Command::Model => (OP_MODEL, vec![]),
            Command::Version => (OP_VERSION, vec![]),
            Command::FirmwareDate => (OP_FIRMWARE_DATE, vec![]),
            Command::Shutdown => (OP_SHUTDOWN, vec![]),
        };
        RawFrame { opcode, payload }
    }
}

// ---------------------------------------------------------------------------
// Message — messages the robot sends back
// ---------------------------------------------------------------------------

/// A message the robot sends back, decoded from a [`RawFrame`].
#[derive(Debug, Clone)]
pub enum Message {
    ActionComplete,
    ActionProgress(u8),
    GetState(status::GetState),
    ReadDirectory(status::Text),
    ExecuteFileProgress(u8),
    /// Raw 48-byte handshake payload; which of the three phases this is
    /// belongs to the ingester, which tracks handshake progress.
    EnterProgramming(Vec<u8>),
    ExitProgramming,
    GetPosition(Vec<u8>),
    Model(status::Text),
    Version(status::Text),
    FirmwareDate(status::Text),
    SerialNumber(status::Text),
    /// Recognized-but-unmodeled or truly unknown opcode.
    Unknown { opcode: u8, payload: Vec<u8> },
}

impl Message {
    /// Decode a `RawFrame` into a typed `Message`.
    pub fn decode(frame: &RawFrame) -> Result<Self> {
        let p = &frame.payload;
        match frame.opcode {
            OP_ACTION_COMPLETE => Ok(Message::ActionComplete),
            OP_ACTION_PROGRESS => {
                let pct = *p.first().ok_or_else(|| WireError::payload_too_short("ActionProgress", 1, 0))?;
                Ok(Message::ActionProgress(pct))
            }
            OP_GET_STATE => Ok(Message::GetState(status::GetState::decode(p)?)),
            OP_READ_DIRECTORY => Ok(Message::ReadDirectory(status::Text::decode(p)?)),
            OP_EXECUTE_FILE => {
                let pct = *p.first().ok_or_else(|| WireError::payload_too_short("ExecuteFileProgress", 1, 0))?;
                Ok(Message::ExecuteFileProgress(pct))
            }
            OP_ENTER_PROGRAMMING => Ok(Message::EnterProgramming(p.to_vec())),
            OP_EXIT_PROGRAMMING => Ok(Message::ExitProgramming),
            OP_GET_POSITION => Ok(Message::GetPosition(p.to_vec())),
            OP_MODEL => Ok(Message::Model(status::Text::decode(p)?)),
            OP_VERSION => Ok(Message::Version(status::Text::decode(p)?)),
            OP_FIRMWARE_DATE => Ok(Message::FirmwareDate(status::Text::decode(p)?)),
            OP_SERIAL_NUMBER => Ok(Message::SerialNumber(status::Text::decode(p)?)),
            other => Ok(Message::Unknown { opcode: other, payload: p.to_vec() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_state_command_is_empty_payload_opcode_15() {
        let frame = Command::GetState.encode();
        assert_eq!(frame.opcode, 15);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn transform_payload_is_single_zero_byte() {
        let frame = Command::Transform.encode();
        assert_eq!(frame.opcode, OP_TRANSFORM);
        assert_eq!(frame.payload, vec![0]);
    }

    #[test]
    fn decode_action_complete() {
        let frame = RawFrame { opcode: OP_ACTION_COMPLETE, payload: vec![] };
        assert!(matches!(Message::decode(&frame).unwrap(), Message::ActionComplete));
    }

    #[test]
    fn decode_unknown_opcode_does_not_error() {
        let frame = RawFrame { opcode: 0x99, payload: vec![1, 2, 3] };
        match Message::decode(&frame).unwrap() {
            Message::Unknown { opcode, payload } => {
                assert_eq!(opcode, 0x99);
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn decode_read_directory_strips_control_bytes() {
        let frame = RawFrame { opcode: OP_READ_DIRECTORY, payload: b"/scripts/dance1.bin\x00".to_vec() };
        match Message::decode(&frame).unwrap() {
            Message::ReadDirectory(t) => assert_eq!(t.text, "/scripts/dance1.bin"),
            other => panic!("expected ReadDirectory, got {other:?}"),
        }
    }
}
