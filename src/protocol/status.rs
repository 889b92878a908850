//! Status and ASCII payload types.

use crate::error::{Result, WireError};

/// GET_STATE response (opcode 15). Two wire formats keyed by payload length:
///
/// - 2 bytes: `[robot_mode_flag, battery_percent]`.
/// - 6 bytes: adds `fast_mode` at `payload[5]`; bytes 2..5 are currently
///   unmapped and preserved only implicitly (not stored).
///
/// Firmware that never reports speed mode only ever sends the 2-byte form.
#[derive(Debug, Clone)]
pub enum GetState {
    Short(GetStateShort),
    Long(GetStateLong),
}

impl GetState {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 {
            return Err(WireError::payload_too_short("GetState", 2, payload.len()).with_raw(payload));
        }
        if payload.len() >= 6 {
            Ok(GetState::Long(GetStateLong::decode(payload)?))
        } else {
            Ok(GetState::Short(GetStateShort::decode(payload)?))
        }
    }

    /// `true` when the device reports humanoid form.
    pub fn robot_mode(&self) -> bool {
        match self {
            GetState::Short(s) => s.robot_mode,
            GetState::Long(s) => s.robot_mode,
        }
    }

    pub fn battery_percent(&self) -> u8 {
        match self {
            GetState::Short(s) => s.battery_percent,
            GetState::Long(s) => s.battery_percent,
        }
    }

    /// `None` on the short form (field not present on the wire).
    pub fn fast_mode(&self) -> Option<bool> {
        match self {
            GetState::Short(_) => None,
            GetState::Long(s) => Some(s.fast_mode),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetStateShort {
    pub robot_mode: bool,
    pub battery_percent: u8,
}

impl GetStateShort {
    fn decode(payload: &[u8]) -> Result<Self> {
        Ok(Self { robot_mode: payload[0] == 0, battery_percent: payload[1] })
    }
}

#[derive(Debug, Clone)]
pub struct GetStateLong {
    pub robot_mode: bool,
    pub battery_percent: u8,
    pub fast_mode: bool,
}

impl GetStateLong {
    fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 6 {
            return Err(WireError::payload_too_short("GetStateLong", 6, payload.len()).with_raw(payload));
        }
        Ok(Self {
            robot_mode: payload[0] == 0,
            battery_percent: payload[1],
            fast_mode: payload[5] == 1,
        })
    }
}

/// An ASCII payload: MODEL/VERSION/FIRMWARE_DATE/SERIAL_NUMBER responses,
/// READ_DIRECTORY listings, and EXECUTE_FILE/READ_DIRECTORY request paths.
#[derive(Debug, Clone)]
pub struct Text {
    pub text: String,
}

impl Text {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let end = payload.iter().rposition(|&b| b >= 0x20).map_or(0, |p| p + 1);
        let start = payload[..end].iter().position(|&b| b >= 0x20).unwrap_or(0);
        Ok(Self { text: String::from_utf8_lossy(&payload[start..end]).into_owned() })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.text.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_state_short_form() {
        let s = GetState::decode(&[0x00, 77]).unwrap();
        assert!(s.robot_mode());
        assert_eq!(s.battery_percent(), 77);
        assert_eq!(s.fast_mode(), None);
    }

    #[test]
    fn get_state_long_form() {
        let s = GetState::decode(&[0x01, 50, 0, 0, 0, 1]).unwrap();
        assert!(!s.robot_mode());
        assert_eq!(s.battery_percent(), 50);
        assert_eq!(s.fast_mode(), Some(true));
    }

    #[test]
    fn text_strips_control_bytes() {
        let t = Text::decode(b"\x00\x001.2.3\x00").unwrap();
        assert_eq!(t.text, "1.2.3");
    }
}
