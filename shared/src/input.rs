//! Input collaborator interface
//!
//! The core never polls devices. A node plugs in an [`InputSampler`] that
//! reports the current move axis (read on the physics tick) and a
//! [`FrameInput`] with the look delta and edge-triggered actions (read once
//! per frame).

use crate::math::Vec2;
use std::collections::VecDeque;

/// Everything sampled once per rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Raw look delta since the previous frame
    pub look_delta: Vec2,
    pub fire: bool,
    pub equip_primary: bool,
    pub equip_secondary: bool,
    pub toggle_capture: bool,
    pub capture: bool,
    /// Some UI element holds the pointer; `capture` is ignored while set
    pub ui_busy: bool,
}

/// Source of player input for one participant
pub trait InputSampler {
    /// Current value of the 2-axis move control, components in [-1, 1]
    fn move_axis(&self) -> Vec2;

    /// Samples look and the actions triggered since the last call
    fn sample_frame(&mut self) -> FrameInput;
}

/// Replays a fixed list of frames, then repeats the last one without triggers
///
/// Used by the host's local participant and by tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    move_axis: Vec2,
    frames: VecDeque<FrameInput>,
    looping: bool,
}

impl ScriptedInput {
    pub fn new(move_axis: Vec2) -> Self {
        Self {
            move_axis,
            frames: VecDeque::new(),
            looping: false,
        }
    }

    /// Replays `frames` forever instead of draining them
    pub fn looping(move_axis: Vec2, frames: Vec<FrameInput>) -> Self {
        Self {
            move_axis,
            frames: frames.into(),
            looping: true,
        }
    }

    pub fn set_move_axis(&mut self, move_axis: Vec2) {
        self.move_axis = move_axis;
    }

    pub fn push_frame(&mut self, frame: FrameInput) {
        self.frames.push_back(frame);
    }
}

impl InputSampler for ScriptedInput {
    fn move_axis(&self) -> Vec2 {
        self.move_axis
    }

    fn sample_frame(&mut self) -> FrameInput {
        match self.frames.pop_front() {
            Some(frame) => {
                if self.looping {
                    self.frames.push_back(frame);
                }
                frame
            }
            None => FrameInput::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_drains_frames() {
        let mut input = ScriptedInput::new(Vec2::new(1.0, 0.0));
        input.push_frame(FrameInput {
            fire: true,
            ..Default::default()
        });

        assert_eq!(input.move_axis(), Vec2::new(1.0, 0.0));
        assert!(input.sample_frame().fire);
        assert!(!input.sample_frame().fire);
    }

    #[test]
    fn test_looping_input_repeats() {
        let frame = FrameInput {
            look_delta: Vec2::new(2.0, 0.0),
            ..Default::default()
        };
        let mut input = ScriptedInput::looping(Vec2::ZERO, vec![frame]);

        for _ in 0..3 {
            assert_eq!(input.sample_frame().look_delta, Vec2::new(2.0, 0.0));
        }
    }
}
