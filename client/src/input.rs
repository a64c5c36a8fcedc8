//! Headless input samplers
//!
//! The client has no window, so its participant is driven by a bot that
//! produces the same [`FrameInput`]s a device poller would: a held move axis,
//! per-frame look deltas and edge-triggered actions.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{FrameInput, InputSampler, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BotKind {
    /// Stands still after capturing the cursor
    Idle,
    /// Walks left and right, switching loadout and firing at each turn
    Strafe,
    /// Random walk with random look
    Wander,
}

/// Builds the sampler for `kind`; `seed` makes the wander bot reproducible
pub fn make_bot(kind: BotKind, seed: Option<u64>) -> Box<dyn InputSampler + Send> {
    match kind {
        BotKind::Idle => Box::new(IdleBot::default()),
        BotKind::Strafe => Box::new(StrafeBot::new(120)),
        BotKind::Wander => Box::new(match seed {
            Some(seed) => WanderBot::seeded(seed),
            None => WanderBot::new(),
        }),
    }
}

#[derive(Debug, Default)]
pub struct IdleBot {
    captured: bool,
}

impl InputSampler for IdleBot {
    fn move_axis(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn sample_frame(&mut self) -> FrameInput {
        let capture = !self.captured;
        self.captured = true;
        FrameInput {
            capture,
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct StrafeBot {
    frames_per_leg: u32,
    frame: u32,
    direction: f32,
}

impl StrafeBot {
    pub fn new(frames_per_leg: u32) -> Self {
        Self {
            frames_per_leg: frames_per_leg.max(1),
            frame: 0,
            direction: 1.0,
        }
    }
}

impl InputSampler for StrafeBot {
    fn move_axis(&self) -> Vec2 {
        Vec2::new(self.direction, 0.0)
    }

    fn sample_frame(&mut self) -> FrameInput {
        let mut input = FrameInput {
            capture: self.frame == 0,
            ..Default::default()
        };

        self.frame += 1;
        if self.frame % self.frames_per_leg == 0 {
            self.direction = -self.direction;
            input.fire = true;
            if self.direction > 0.0 {
                input.equip_primary = true;
            } else {
                input.equip_secondary = true;
            }
        }

        input
    }
}

#[derive(Debug)]
pub struct WanderBot {
    rng: StdRng,
    move_axis: Vec2,
    turn_rate: f32,
    frame: u32,
}

impl WanderBot {
    const FRAMES_PER_DECISION: u32 = 90;

    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            move_axis: Vec2::ZERO,
            turn_rate: 0.0,
            frame: 0,
        }
    }

    fn decide(&mut self) {
        self.move_axis = Vec2::new(
            self.rng.gen_range(-1.0..=1.0),
            self.rng.gen_range(-1.0..=1.0),
        );
        self.turn_rate = self.rng.gen_range(-5.0..=5.0);
    }
}

impl Default for WanderBot {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSampler for WanderBot {
    fn move_axis(&self) -> Vec2 {
        self.move_axis
    }

    fn sample_frame(&mut self) -> FrameInput {
        if self.frame % Self::FRAMES_PER_DECISION == 0 {
            self.decide();
        }
        let capture = self.frame == 0;
        self.frame += 1;

        FrameInput {
            look_delta: Vec2::new(self.turn_rate, self.rng.gen_range(-1.0..=1.0)),
            fire: self.rng.gen_bool(0.02),
            equip_primary: self.rng.gen_bool(0.005),
            equip_secondary: self.rng.gen_bool(0.005),
            capture,
            ..Default::default()
        }
    }
}
