//! Mutable per-connection robot state: joint values, biases, mode flags.
//!
//! A [`RobotSnapshot`] is the single source of truth for one session. It is
//! created with variant-appropriate defaults at connection time, mutated by
//! the notification ingester (and a small number of pre-command local
//! writes), and read by the state machine and any caller wanting a status
//! view. It performs no I/O of its own.

use std::collections::HashMap;

use crate::error::{Result, WireError};
use crate::joints::{self, JointDescriptor, NUM_SLOTS, POSITION_TRAILER};
use crate::variant::Variant;

/// Runtime state for one joint: its current value, learned bias, and lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointRuntimeState {
    pub value: f64,
    pub bias: Option<u8>,
    pub locked: bool,
}

impl JointRuntimeState {
    fn default_for(descriptor: &JointDescriptor) -> Self {
        Self {
            value: 0.0,
            bias: None,
            locked: descriptor.initial_lock,
        }
    }
}

/// Mutable per-connection robot state.
#[derive(Debug, Clone)]
pub struct RobotSnapshot {
    pub variant: Variant,
    pub joints: HashMap<&'static str, JointRuntimeState>,
    /// Populated once, from the second ENTER_PROGRAMMING handshake frame.
    pub vehicle_snapshot: Option<HashMap<&'static str, JointRuntimeState>>,
    /// Populated once, from the third ENTER_PROGRAMMING handshake frame.
    pub humanoid_snapshot: Option<HashMap<&'static str, JointRuntimeState>>,
    pub bias_learned: bool,
    pub battery_percent: u8,
    pub robot_mode: bool,
    pub fast_mode: bool,
    pub programming_mode: bool,
    pub moving: bool,
    pub acting: bool,
    pub acting_progress: u8,
}

impl RobotSnapshot {
    /// A freshly connected snapshot: every joint at 0, unbiased, locked per
    /// the catalogue's initial lock state, battery optimistically full.
    pub fn new(variant: Variant) -> Self {
        let joints = joints::catalogue(variant)
            .iter()
            .map(|d| (d.label, JointRuntimeState::default_for(d)))
            .collect();
        Self {
            variant,
            joints,
            vehicle_snapshot: None,
            humanoid_snapshot: None,
            bias_learned: false,
            battery_percent: 100,
            robot_mode: true,
            fast_mode: false,
            programming_mode: false,
            moving: false,
            acting: false,
            acting_progress: 0,
        }
    }

    fn descriptor(&self, label: &str) -> Result<&'static JointDescriptor> {
        joints::descriptor(self.variant, label).ok_or_else(|| WireError::UnknownJoint(label.to_string()))
    }

    /// Look up one joint's current value, clamped to its descriptor range.
    pub fn joint_value(&self, label: &str) -> Result<f64> {
        let descriptor = self.descriptor(label)?;
        let state = self.joints.get(label).expect("catalogue and map are in sync");
        Ok(state.value.clamp(f64::from(descriptor.min_deg), f64::from(descriptor.max_deg)))
    }

    /// Set a joint's target value locally, ahead of sending SET_POSITION.
    /// Clamped into range per invariant I1.
    pub fn set_joint_value(&mut self, label: &str, value: f64) -> Result<()> {
        let descriptor = self.descriptor(label)?;
        let clamped = value.clamp(f64::from(descriptor.min_deg), f64::from(descriptor.max_deg));
        self.joints.get_mut(label).expect("catalogue and map are in sync").value = clamped;
        Ok(())
    }

    /// Learn per-joint biases from the first ENTER_PROGRAMMING handshake
    /// frame (48 bytes, one per slot). Sets `bias_learned`.
    pub fn learn_biases(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() != NUM_SLOTS {
            return Err(WireError::unexpected_length("ENTER_PROGRAMMING bias table", NUM_SLOTS, payload.len())
                .with_raw(payload));
        }
        for descriptor in joints::catalogue(self.variant) {
            let bias = payload[descriptor.slot as usize];
            let state = self.joints.get_mut(descriptor.label).expect("catalogue and map are in sync");
            state.bias = Some(bias);
            state.value = joints::decode_byte(bias, descriptor.min_deg, descriptor.max_deg, descriptor.wheel, bias);
        }
        self.bias_learned = true;
        Ok(())
    }

    /// Decode a 48-byte slot array into a standalone joint map (used for the
    /// vehicle/humanoid handshake snapshots, which don't mutate `joints`).
    fn decode_slots(&self, payload: &[u8]) -> Result<HashMap<&'static str, JointRuntimeState>> {
        if payload.len() != NUM_SLOTS {
            return Err(WireError::unexpected_length("position frame", NUM_SLOTS, payload.len()).with_raw(payload));
        }
        let mut out = HashMap::new();
        for descriptor in joints::catalogue(self.variant) {
            let existing = self.joints.get(descriptor.label).expect("catalogue and map are in sync");
            let bias = existing.bias.unwrap_or(0);
            let byte = payload[descriptor.slot as usize];
            let value = joints::decode_byte(byte, descriptor.min_deg, descriptor.max_deg, descriptor.wheel, bias);
            out.insert(
                descriptor.label,
                JointRuntimeState { value, bias: Some(bias), locked: existing.locked },
            );
        }
        Ok(out)
    }

    /// Apply a GET_POSITION (or first-phase ENTER_PROGRAMMING) payload to the
    /// live `joints` map, clamping every decoded value.
    pub fn apply_position(&mut self, payload: &[u8]) -> Result<()> {
        let decoded = self.decode_slots(payload)?;
        self.joints = decoded;
        Ok(())
    }

    /// Record the second handshake frame as the vehicle-form snapshot.
    pub fn record_vehicle_snapshot(&mut self, payload: &[u8]) -> Result<()> {
        self.vehicle_snapshot = Some(self.decode_slots(payload)?);
        Ok(())
    }

    /// Record the third handshake frame as the humanoid-form snapshot.
    pub fn record_humanoid_snapshot(&mut self, payload: &[u8]) -> Result<()> {
        self.humanoid_snapshot = Some(self.decode_slots(payload)?);
        Ok(())
    }

    /// Encode the live joint map into a 49-byte SET_POSITION payload
    /// (48 slot bytes plus the fixed trailer, invariant I6).
    pub fn encode_position_frame(&self) -> Result<[u8; NUM_SLOTS + 1]> {
        if !self.bias_learned {
            return Err(WireError::UnknownJoint("bias table not learned".to_string()));
        }
        let mut frame = [0u8; NUM_SLOTS + 1];
        for descriptor in joints::catalogue(self.variant) {
            let state = self.joints.get(descriptor.label).expect("catalogue and map are in sync");
            let bias = state.bias.expect("bias_learned implies every joint has a bias");
            frame[descriptor.slot as usize] =
                joints::encode_byte(state.value, descriptor.min_deg, descriptor.max_deg, descriptor.wheel, bias);
        }
        frame[NUM_SLOTS] = POSITION_TRAILER;
        Ok(frame)
    }

    /// Encode the live lock map into a 48-byte LOCKS payload. Polarity is
    /// inverted versus the internal `locked` flag: `0` means locked, `1`
    /// means unlocked on the wire.
    pub fn encode_lock_frame(&self) -> [u8; NUM_SLOTS] {
        let mut frame = [0u8; NUM_SLOTS];
        for descriptor in joints::catalogue(self.variant) {
            let state = self.joints.get(descriptor.label).expect("catalogue and map are in sync");
            frame[descriptor.slot as usize] = u8::from(!state.locked);
        }
        frame
    }

    /// Set every joint's `locked` flag from a 48-byte LOCKS-style wire frame.
    pub fn apply_lock_frame(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() != NUM_SLOTS {
            return Err(WireError::unexpected_length("lock frame", NUM_SLOTS, payload.len()).with_raw(payload));
        }
        for descriptor in joints::catalogue(self.variant) {
            let unlocked = payload[descriptor.slot as usize] != 0;
            self.joints.get_mut(descriptor.label).expect("catalogue and map are in sync").locked = !unlocked;
        }
        Ok(())
    }

    /// Set every joint's `locked` flag to `false` (UNLOCK_ALL).
    pub fn unlock_all(&mut self) {
        for state in self.joints.values_mut() {
            state.locked = false;
        }
    }

    /// Set every joint's `locked` flag to `true` (LOCK_ALL).
    pub fn lock_all(&mut self) {
        for state in self.joints.values_mut() {
            state.locked = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_snapshot_has_every_catalogue_joint() {
        let snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        assert_eq!(snap.joints.len(), 27);
        assert!(!snap.bias_learned);
        assert_eq!(snap.battery_percent, 100);
    }

    #[test]
    fn wheel_joints_start_locked_others_unlocked() {
        let snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        assert!(snap.joints["leftWheelSpeed"].locked);
        assert!(!snap.joints["head"].locked);
    }

    #[test]
    fn learn_biases_then_round_trip_position_frame() {
        let mut snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        let biases: [u8; NUM_SLOTS] = {
            let mut b = [0u8; NUM_SLOTS];
            let literal: [u8; 27] = [
                0x7A, 0x7A, 0x59, 0x86, 0x7C, 0x77, 0x75, 0x9B, 0x71, 0x82, 0x4B, 0x4F, 0xBF, 0x75, 0xE0, 0xC4, 0xAE,
                0xA7, 0x39, 0x79, 0x82, 0x34, 0xCB, 0x53, 0x4F, 0x00, 0x00,
            ];
            b[..27].copy_from_slice(&literal);
            b
        };
        snap.learn_biases(&biases).unwrap();
        assert!(snap.bias_learned);
        let frame = snap.encode_position_frame().unwrap();
        assert_eq!(frame[NUM_SLOTS], POSITION_TRAILER);
        snap.apply_position(&frame[..NUM_SLOTS]).unwrap();
        for descriptor in joints::catalogue(Variant::AutobotHumanoid) {
            assert_eq!(snap.joints[descriptor.label].value, 0.0);
        }
    }

    #[test]
    fn set_joint_value_clamps_out_of_range() {
        let mut snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        snap.set_joint_value("leftHip", 999.0).unwrap();
        assert_eq!(snap.joint_value("leftHip").unwrap(), 40.0);
    }

    #[test]
    fn set_joint_value_rejects_unknown_label() {
        let mut snap = RobotSnapshot::new(Variant::Dinobot);
        assert!(snap.set_joint_value("leftScapula", 1.0).is_err());
    }

    #[test]
    fn lock_frame_polarity_is_inverted() {
        let mut snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        snap.unlock_all();
        let frame = snap.encode_lock_frame();
        // every joint unlocked -> every slot is 1
        for descriptor in joints::catalogue(Variant::AutobotHumanoid) {
            assert_eq!(frame[descriptor.slot as usize], 1);
        }
        snap.lock_all();
        let frame = snap.encode_lock_frame();
        for descriptor in joints::catalogue(Variant::AutobotHumanoid) {
            assert_eq!(frame[descriptor.slot as usize], 0);
        }
    }

    #[test]
    fn apply_lock_frame_round_trips() {
        let mut snap = RobotSnapshot::new(Variant::AutobotHumanoid);
        let mut frame = [1u8; NUM_SLOTS];
        frame[0] = 0; // leftHip locked
        snap.apply_lock_frame(&frame).unwrap();
        assert!(snap.joints["leftHip"].locked);
        assert!(!snap.joints["rightHip"].locked);
    }
}
