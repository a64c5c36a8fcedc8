//! Per-participant controller run by the node that samples the input
//!
//! The controller predicts look and loadout locally and turns input into
//! intents on two cadences: [`PlayerController::update_frame`] every frame
//! (look, equip, fire, capture) and [`PlayerController::update_fixed`] every
//! physics tick (movement). Intents leave through a [`Route`], so the same
//! controller drives a participant whether its node is the authority or not.

use crate::input::FrameInput;
use crate::intent::{Intent, LookIntent, MovementIntent, Route};
use crate::look::{accumulate_look, LookConfig, LookState};
use crate::math::{Vec2, Vec3};
use crate::movement::{MovementAuthority, MovementConfig, Transform};
use crate::participant::{ConnectionId, LoadoutSlot};
use crate::physics::PhysicsQuery;

#[derive(Debug, Clone)]
pub struct PlayerController {
    id: ConnectionId,
    movement: MovementAuthority,
    look_config: LookConfig,
    /// Locally predicted orientation; display only
    look: LookState,
    loadout: LoadoutSlot,
    cursor_captured: bool,
    next_look_sequence: u64,
}

impl PlayerController {
    pub fn new(id: ConnectionId, movement: MovementConfig, look_config: LookConfig) -> Self {
        Self {
            id,
            movement: MovementAuthority::new(movement),
            look_config,
            look: LookState::default(),
            loadout: LoadoutSlot::Primary,
            cursor_captured: false,
            next_look_sequence: 1,
        }
    }

    /// Frame-rate update: capture state, look, equip and fire
    pub fn update_frame(&mut self, input: &FrameInput, route: &mut Route<'_>) {
        if input.toggle_capture {
            self.cursor_captured = !self.cursor_captured;
        }
        if input.capture && !input.ui_busy {
            self.cursor_captured = true;
        }

        if !self.cursor_captured {
            return;
        }

        self.perform_look(input.look_delta, route);

        if input.equip_primary {
            self.equip(LoadoutSlot::Primary, route);
        } else if input.equip_secondary {
            self.equip(LoadoutSlot::Secondary, route);
        }

        if input.fire {
            route.send(self.id, Intent::Fire);
        }
    }

    /// Physics-rate update: computes the desired velocity from `position`
    /// and the predicted facing, then submits it.
    pub fn update_fixed(
        &mut self,
        move_axis: Vec2,
        position: Vec3,
        physics: &dyn PhysicsQuery,
        route: &mut Route<'_>,
    ) {
        let transform = Transform::new(position, self.look.yaw);
        let desired_velocity = self
            .movement
            .desired_velocity(&transform, move_axis, physics);

        route.send(self.id, Intent::Move(MovementIntent { desired_velocity }));
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn look(&self) -> LookState {
        self.look
    }

    pub fn loadout(&self) -> LoadoutSlot {
        self.loadout
    }

    pub fn is_cursor_captured(&self) -> bool {
        self.cursor_captured
    }

    pub fn look_config(&self) -> LookConfig {
        self.look_config
    }

    fn perform_look(&mut self, delta: Vec2, route: &mut Route<'_>) {
        if delta == Vec2::ZERO || !delta.is_finite() {
            return;
        }

        self.look = accumulate_look(self.look, delta, self.look_config.sensitivity);

        let sequence = self.next_look_sequence;
        self.next_look_sequence = self.next_look_sequence.saturating_add(1);
        route.send(self.id, Intent::Look(LookIntent { sequence, delta }));
    }

    fn equip(&mut self, slot: LoadoutSlot, route: &mut Route<'_>) {
        self.loadout = slot;
        route.send(self.id, Intent::Equip(slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentChannel;
    use crate::physics::StaticWorld;
    use assert_approx_eq::assert_approx_eq;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Outbox {
        sent: RefCell<Vec<Intent>>,
    }

    impl IntentChannel for Outbox {
        fn submit(&self, _participant: ConnectionId, intent: Intent) {
            self.sent.borrow_mut().push(intent);
        }
    }

    fn controller() -> PlayerController {
        PlayerController::new(1, MovementConfig::default(), LookConfig::new(1.0))
    }

    fn captured_frame(look_delta: Vec2) -> FrameInput {
        FrameInput {
            look_delta,
            capture: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_uncaptured_frame_sends_nothing() {
        let outbox = Outbox::default();
        let mut controller = controller();

        let frame = FrameInput {
            look_delta: Vec2::new(10.0, 0.0),
            fire: true,
            ..Default::default()
        };
        controller.update_frame(&frame, &mut Route::Remote(&outbox));

        assert!(outbox.sent.borrow().is_empty());
        assert_eq!(controller.look(), LookState::default());
    }

    #[test]
    fn test_capture_blocked_by_ui() {
        let outbox = Outbox::default();
        let mut controller = controller();

        let frame = FrameInput {
            capture: true,
            ui_busy: true,
            ..Default::default()
        };
        controller.update_frame(&frame, &mut Route::Remote(&outbox));
        assert!(!controller.is_cursor_captured());
    }

    #[test]
    fn test_toggle_capture() {
        let outbox = Outbox::default();
        let mut controller = controller();
        let toggle = FrameInput {
            toggle_capture: true,
            ..Default::default()
        };

        controller.update_frame(&toggle, &mut Route::Remote(&outbox));
        assert!(controller.is_cursor_captured());
        controller.update_frame(&toggle, &mut Route::Remote(&outbox));
        assert!(!controller.is_cursor_captured());
    }

    #[test]
    fn test_look_predicts_and_sends_sequenced_deltas() {
        let outbox = Outbox::default();
        let mut controller = controller();

        controller.update_frame(&captured_frame(Vec2::new(30.0, 5.0)), &mut Route::Remote(&outbox));
        controller.update_frame(&captured_frame(Vec2::new(-40.0, 0.0)), &mut Route::Remote(&outbox));

        assert_approx_eq!(controller.look().yaw, 350.0, 1e-4);
        assert_approx_eq!(controller.look().pitch, 5.0, 1e-4);

        let sent = outbox.sent.borrow();
        assert_eq!(
            *sent,
            vec![
                Intent::Look(LookIntent {
                    sequence: 1,
                    delta: Vec2::new(30.0, 5.0)
                }),
                Intent::Look(LookIntent {
                    sequence: 2,
                    delta: Vec2::new(-40.0, 0.0)
                }),
            ]
        );
    }

    #[test]
    fn test_look_sequence_keeps_increasing_after_long_sessions() {
        let outbox = Outbox::default();
        let mut controller = controller();
        controller.next_look_sequence = u64::from(u32::MAX);

        controller.update_frame(&captured_frame(Vec2::new(1.0, 0.0)), &mut Route::Remote(&outbox));
        controller.update_frame(&captured_frame(Vec2::new(1.0, 0.0)), &mut Route::Remote(&outbox));

        let sequences: Vec<u64> = outbox
            .sent
            .borrow()
            .iter()
            .filter_map(|intent| match intent {
                Intent::Look(look) => Some(look.sequence),
                _ => None,
            })
            .collect();
        assert_eq!(sequences, vec![u64::from(u32::MAX), u64::from(u32::MAX) + 1]);
    }

    #[test]
    fn test_equip_prefers_primary_and_fire_follows() {
        let outbox = Outbox::default();
        let mut controller = controller();

        controller.update_frame(
            &FrameInput {
                capture: true,
                equip_secondary: true,
                ..Default::default()
            },
            &mut Route::Remote(&outbox),
        );
        assert_eq!(controller.loadout(), LoadoutSlot::Secondary);

        controller.update_frame(
            &FrameInput {
                equip_primary: true,
                equip_secondary: true,
                fire: true,
                ..Default::default()
            },
            &mut Route::Remote(&outbox),
        );

        assert_eq!(controller.loadout(), LoadoutSlot::Primary);
        assert_eq!(
            *outbox.sent.borrow(),
            vec![
                Intent::Equip(LoadoutSlot::Secondary),
                Intent::Equip(LoadoutSlot::Primary),
                Intent::Fire,
            ]
        );
    }

    #[test]
    fn test_fixed_update_uses_predicted_yaw() {
        let outbox = Outbox::default();
        let world = StaticWorld::default();
        let mut controller = controller();

        // Turn to face +X; forward input then moves along +X
        controller.update_frame(&captured_frame(Vec2::new(90.0, 0.0)), &mut Route::Remote(&outbox));
        outbox.sent.borrow_mut().clear();

        controller.update_fixed(
            Vec2::new(0.0, 1.0),
            Vec3::ZERO,
            &world,
            &mut Route::Remote(&outbox),
        );

        let sent = outbox.sent.borrow();
        match sent.as_slice() {
            [Intent::Move(intent)] => {
                assert_approx_eq!(intent.desired_velocity.x, crate::PLAYER_SPEED, 1e-4);
                assert_approx_eq!(intent.desired_velocity.z, 0.0, 1e-4);
            }
            other => panic!("Unexpected intents: {:?}", other),
        }
    }
}
