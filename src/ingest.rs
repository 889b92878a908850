//! Notification ingester: maps decoded inbound messages into snapshot
//! mutations, including the three-phase ENTER_PROGRAMMING handshake.

use crate::error::Result;
use crate::protocol::Message;
use crate::snapshot::RobotSnapshot;

/// How far the ENTER_PROGRAMMING handshake has progressed for this session.
/// The handshake only ever runs once; later ENTER_PROGRAMMING frames arrive
/// but are ignored once `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakePhase {
    AwaitingBiasTable,
    AwaitingVehicleSnapshot,
    AwaitingHumanoidSnapshot,
    Done,
}

/// Applies decoded frames to a [`RobotSnapshot`], one session's worth of
/// state at a time. Owns only the handshake progress counter; everything
/// else lives in the snapshot itself.
pub struct Ingester {
    handshake: HandshakePhase,
}

impl Ingester {
    pub fn new() -> Self {
        Self { handshake: HandshakePhase::AwaitingBiasTable }
    }

    /// Apply one decoded message's effect to `snapshot`.
    pub fn ingest(&mut self, snapshot: &mut RobotSnapshot, message: &Message) -> Result<()> {
        match message {
            Message::EnterProgramming(payload) => self.ingest_enter_programming(snapshot, payload)?,
            Message::ExitProgramming => snapshot.programming_mode = false,
            Message::ActionComplete => snapshot.acting = false,
            Message::GetPosition(payload) => snapshot.apply_position(payload)?,
            Message::GetState(state) => {
                snapshot.robot_mode = state.robot_mode();
                snapshot.battery_percent = state.battery_percent();
                if let Some(fast) = state.fast_mode() {
                    snapshot.fast_mode = fast;
                }
            }
            Message::ActionProgress(pct) | Message::ExecuteFileProgress(pct) => {
                snapshot.acting_progress = *pct;
                if *pct == 100 {
                    snapshot.acting = false;
                }
            }
            // ASCII payloads (model/version/firmware/serial number) and
            // directory listings surface to the caller via the returned
            // `Message`; the snapshot itself has no field for them.
            Message::ReadDirectory(_)
            | Message::Model(_)
            | Message::Version(_)
            | Message::FirmwareDate(_)
            | Message::SerialNumber(_) => {}
            Message::Unknown { .. } => {}
        }
        Ok(())
    }

    fn ingest_enter_programming(&mut self, snapshot: &mut RobotSnapshot, payload: &[u8]) -> Result<()> {
        snapshot.programming_mode = true;
        match self.handshake {
            HandshakePhase::AwaitingBiasTable => {
                snapshot.learn_biases(payload)?;
                self.handshake = HandshakePhase::AwaitingVehicleSnapshot;
            }
            HandshakePhase::AwaitingVehicleSnapshot => {
                snapshot.record_vehicle_snapshot(payload)?;
                self.handshake = HandshakePhase::AwaitingHumanoidSnapshot;
            }
            HandshakePhase::AwaitingHumanoidSnapshot => {
                snapshot.record_humanoid_snapshot(payload)?;
                self.handshake = HandshakePhase::Done;
            }
            HandshakePhase::Done => {}
        }
        Ok(())
    }
}

impl Default for Ingester {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Variant;

    fn bias_payload() -> Vec<u8> {
        let mut p = vec![0u8; crate::joints::NUM_SLOTS];
        p[0] = 0x7A;
        p
    }

    #[test]
    fn three_enter_programming_frames_fill_bias_then_vehicle_then_humanoid() {
        let mut snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        let mut ingester = Ingester::new();

        ingester.ingest(&mut snap, &Message::EnterProgramming(bias_payload())).unwrap();
        assert!(snap.bias_learned);
        assert!(snap.vehicle_snapshot.is_none());

        ingester.ingest(&mut snap, &Message::EnterProgramming(bias_payload())).unwrap();
        assert!(snap.vehicle_snapshot.is_some());
        assert!(snap.humanoid_snapshot.is_none());

        ingester.ingest(&mut snap, &Message::EnterProgramming(bias_payload())).unwrap();
        assert!(snap.humanoid_snapshot.is_some());
    }

    #[test]
    fn fourth_enter_programming_frame_is_ignored() {
        let mut snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        let mut ingester = Ingester::new();
        for _ in 0..3 {
            ingester.ingest(&mut snap, &Message::EnterProgramming(bias_payload())).unwrap();
        }
        let humanoid_before = snap.humanoid_snapshot.clone();
        let mut garbage = bias_payload();
        garbage[1] = 0xFF;
        ingester.ingest(&mut snap, &Message::EnterProgramming(garbage)).unwrap();
        assert_eq!(
            snap.humanoid_snapshot.as_ref().map(|m| m["leftHip"].value),
            humanoid_before.map(|m| m["leftHip"].value)
        );
    }

    #[test]
    fn action_progress_100_clears_acting() {
        let mut snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        snap.acting = true;
        let mut ingester = Ingester::new();
        ingester.ingest(&mut snap, &Message::ActionProgress(100)).unwrap();
        assert!(!snap.acting);
        assert_eq!(snap.acting_progress, 100);
    }

    #[test]
    fn get_state_updates_mode_and_battery() {
        let mut snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        let mut ingester = Ingester::new();
        let state = crate::protocol::status::GetState::decode(&[0x01, 42]).unwrap();
        ingester.ingest(&mut snap, &Message::GetState(state)).unwrap();
        assert!(!snap.robot_mode);
        assert_eq!(snap.battery_percent, 42);
    }
}
