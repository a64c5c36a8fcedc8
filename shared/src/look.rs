//! Look accumulation: yaw wraps into [0, 360), pitch clamps to [-90, 90]

use crate::math::Vec2;
use serde::{Deserialize, Serialize};

pub const PITCH_LIMIT: f32 = 90.0;
pub const DEFAULT_LOOK_SENSITIVITY: f32 = 0.1;
/// Sensitivities outside this range are clamped when a participant connects
pub const MIN_LOOK_SENSITIVITY: f32 = 0.001;
pub const MAX_LOOK_SENSITIVITY: f32 = 10.0;

/// Accumulated orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LookState {
    pub yaw: f32,
    pub pitch: f32,
}

impl LookState {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw: wrap_yaw(yaw),
            pitch: clamp_pitch(pitch),
        }
    }
}

/// Per-participant look tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookConfig {
    pub sensitivity: f32,
}

impl LookConfig {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity: clamp_sensitivity(sensitivity),
        }
    }
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_LOOK_SENSITIVITY,
        }
    }
}

/// Applies a raw look delta to the current orientation
///
/// Both the local prediction and the authority run this same function; the
/// authority only ever feeds it deltas, never a remote absolute orientation.
pub fn accumulate_look(current: LookState, delta: Vec2, sensitivity: f32) -> LookState {
    LookState {
        yaw: wrap_yaw(current.yaw + delta.x * sensitivity),
        pitch: clamp_pitch(current.pitch + delta.y * sensitivity),
    }
}

/// Euclidean mod into [0, 360)
pub fn wrap_yaw(yaw: f32) -> f32 {
    let wrapped = yaw.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub fn clamp_pitch(pitch: f32) -> f32 {
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}

pub fn clamp_sensitivity(sensitivity: f32) -> f32 {
    if sensitivity.is_finite() {
        sensitivity.clamp(MIN_LOOK_SENSITIVITY, MAX_LOOK_SENSITIVITY)
    } else {
        DEFAULT_LOOK_SENSITIVITY
    }
}
