//! Per-variant joint catalogues and the joint-byte codec.
//!
//! Each variant's table is static data, expressed as a compile-time-constant
//! array keyed by [`Variant`](crate::variant::Variant) rather than per-variant
//! subclasses or dynamic dispatch.

use crate::variant::Variant;

/// Number of populated + reserved slots in a position/lock frame.
pub const NUM_SLOTS: usize = 48;
/// Fixed trailer byte of a 49-byte position frame.
pub const POSITION_TRAILER: u8 = 40;

/// An immutable per-variant joint descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointDescriptor {
    pub label: &'static str,
    pub slot: u8,
    pub min_deg: i32,
    pub max_deg: i32,
    pub wheel: bool,
    pub initial_lock: bool,
}

macro_rules! joint {
    ($label:expr, $slot:expr, $min:expr, $max:expr) => {
        JointDescriptor {
            label: $label,
            slot: $slot,
            min_deg: $min,
            max_deg: $max,
            wheel: false,
            initial_lock: false,
        }
    };
    (wheel $label:expr, $slot:expr, $min:expr, $max:expr) => {
        JointDescriptor {
            label: $label,
            slot: $slot,
            min_deg: $min,
            max_deg: $max,
            wheel: true,
            initial_lock: true,
        }
    };
}

const AUTOBOT_HUMANOID: &[JointDescriptor] = &[
    joint!("leftHip", 0, 0, 40),
    joint!("leftThigh", 1, -95, 95),
    joint!("leftKnee", 2, -30, 95),
    joint!("leftAnkle", 3, -80, 95),
    joint!("leftFoot", 4, -40, 20),
    joint!("rightHip", 5, 0, 40),
    joint!("rightThigh", 6, -95, 95),
    joint!("rightKnee", 7, -95, 30),
    joint!("rightAnkle", 8, -95, 80),
    joint!("rightFoot", 9, -20, 40),
    joint!("leftScapula", 10, 0, 95),
    joint!("leftShoulder", 11, 0, 90),
    joint!("leftArm", 12, -185, 30),
    joint!("leftUpperArm", 13, -95, 95),
    joint!("leftElbow", 14, -60, 95),
    joint!("leftWrist", 15, -30, 185),
    joint!("rightScapula", 16, -95, 0),
    joint!("rightShoulder", 17, -90, 0),
    joint!("rightArm", 18, -30, 185),
    joint!("rightUpperArm", 19, -95, 95),
    joint!("rightElbow", 20, -95, 60),
    joint!("rightWrist", 21, -40, 185),
    joint!("waist", 22, -185, 40),
    joint!("abdomen", 23, -15, 95),
    joint!("head", 24, 0, 105),
    joint!(wheel "leftWheelSpeed", 25, -100, 100),
    joint!(wheel "rightWheelSpeed", 26, -100, 100),
];

const DINOBOT: &[JointDescriptor] = &[
    joint!("leftHip", 0, -5, 60),
    joint!("leftThigh", 1, -60, 90),
    joint!("leftKnee", 2, 0, 80),
    joint!("leftAnkle", 3, -30, 50),
    joint!("leftFoot", 4, -60, 10),
    joint!("rightHip", 5, -60, 5),
    joint!("rightThigh", 6, -90, 60),
    joint!("rightKnee", 7, -80, 0),
    joint!("rightAnkle", 8, -50, 30),
    joint!("rightFoot", 9, -10, 60),
    joint!("leftShoulder", 11, -180, 40),
    joint!("leftArm", 12, -60, 5),
    joint!("leftUpperArm", 13, -100, 100),
    joint!("leftElbow", 14, -60, 60),
    joint!("leftWrist", 15, 0, 160),
    joint!("rightShoulder", 17, -40, 180),
    joint!("rightArm", 18, -5, 60),
    joint!("rightUpperArm", 19, -100, 100),
    joint!("rightElbow", 20, -60, 60),
    joint!("rightWrist", 21, -160, 0),
    joint!("head", 24, 0, 105),
    joint!(wheel "leftWheelSpeed", 25, -100, 100),
    joint!(wheel "rightWheelSpeed", 26, -100, 100),
];

const DECEPTICON_HUMANOID: &[JointDescriptor] = &[
    joint!("leftHip", 0, -40, 10),
    joint!("leftThigh", 1, -95, 95),
    joint!("leftCalf", 2, -95, 30),
    joint!("leftAnkle", 3, -95, 50),
    joint!("leftFoot", 4, -20, 60),
    joint!("rightHip", 5, -10, 40),
    joint!("rightThigh", 6, -95, 95),
    joint!("rightCalf", 7, -30, 95),
    joint!("rightAnkle", 8, -50, 95),
    joint!("rightFoot", 9, -60, 20),
    joint!("leftScapula", 10, -95, 0),
    joint!("leftShoulder", 11, -95, 15),
    joint!("leftRearArm", 12, -30, 185),
    joint!("leftElbow", 13, -95, 95),
    joint!("leftForeArm", 14, -95, 60),
    joint!("leftWrist", 15, -30, 185),
    joint!("rightScapula", 16, 0, 95),
    joint!("rightShoulder", 17, -15, 95),
    joint!("rightUpperArm", 18, -185, 30),
    joint!("rightElbow", 19, -95, 95),
    joint!("rightForeArm", 20, -60, 95),
    joint!("rightWrist", 21, -185, 30),
    joint!("waist", 22, -185, 30),
    joint!("abdomen", 23, -15, 95),
    joint!("head", 24, 0, 105),
    joint!(wheel "leftWheelSpeed", 25, -100, 100),
    joint!(wheel "rightWheelSpeed", 26, -100, 100),
];

/// The joint table for a given variant.
pub fn catalogue(variant: Variant) -> &'static [JointDescriptor] {
    match variant {
        Variant::AutobotHumanoid => AUTOBOT_HUMANOID,
        Variant::Dinobot => DINOBOT,
        Variant::DecepticonHumanoid => DECEPTICON_HUMANOID,
    }
}

/// Look up a joint descriptor by label within a variant's catalogue.
pub fn descriptor(variant: Variant, label: &str) -> Option<&'static JointDescriptor> {
    catalogue(variant).iter().find(|d| d.label == label)
}

/// Clamp a floating-point joint value into `[min, max]` and truncate toward
/// zero, matching the reference implementation's `int(value)` semantics.
fn clamp_trunc(value: f64, min: i32, max: i32) -> i32 {
    let truncated = value.trunc() as i32;
    truncated.clamp(min, max)
}

/// Encode one joint's clamped value plus its learned bias into a wire byte.
///
/// Wheel joints are first reduced to unsigned two's-complement over 8 bits
/// before the bias is added.
pub fn encode_byte(value: f64, min: i32, max: i32, wheel: bool, bias: u8) -> u8 {
    let clamped = clamp_trunc(value, min, max);
    let unsigned = if wheel && clamped < 0 {
        clamped + 256
    } else {
        clamped
    };
    // `as u8` performs two's-complement truncation, which is exactly a
    // mod-256 reduction even for negative `unsigned` values.
    (unsigned as u8).wrapping_add(bias)
}

/// Decode a wire byte back into a clamped joint value, given the same
/// descriptor bounds and learned bias used to encode it.
pub fn decode_byte(byte: u8, min: i32, max: i32, wheel: bool, bias: u8) -> f64 {
    let raw = i32::from(byte) - i32::from(bias);
    let value = if wheel {
        let eight_bit = raw.rem_euclid(256);
        if eight_bit > 127 {
            eight_bit - 256
        } else {
            eight_bit
        }
    } else {
        raw
    };
    value.clamp(min, max) as f64
}
