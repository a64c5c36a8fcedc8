//! Authoritative world: participant state and the integration step
//!
//! Intents from every source land in [`World::apply_intent`]. The world also
//! plays the physics collaborator's role for its bodies: gravity while
//! airborne, position integration and penetration resolution.

use log::{debug, info, warn};
use shared::{
    accumulate_look, Authority, ConnectionId, Intent, LoadoutSlot, LookConfig, LookSequencer,
    LookState, MovementAuthority, MovementConfig, ParticipantState, StaticWorld, Vec3, GRAVITY,
};
use std::collections::HashMap;

/// Authority-owned state of one participant
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ConnectionId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub look: LookState,
    pub look_config: LookConfig,
    pub look_sequencer: LookSequencer,
    pub loadout: LoadoutSlot,
    pub shots_fired: u32,
}

impl Participant {
    pub fn new(id: ConnectionId, position: Vec3, look_config: LookConfig) -> Self {
        Self {
            id,
            position,
            velocity: Vec3::ZERO,
            look: LookState::default(),
            look_config,
            look_sequencer: LookSequencer::new(),
            loadout: LoadoutSlot::Primary,
            shots_fired: 0,
        }
    }

    pub fn state(&self) -> ParticipantState {
        ParticipantState {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            look: self.look,
            loadout: self.loadout,
        }
    }
}

pub struct World {
    pub tick: u32,
    participants: HashMap<ConnectionId, Participant>,
    physics: StaticWorld,
    movement: MovementAuthority,
}

impl World {
    pub fn new(physics: StaticWorld, movement: MovementConfig) -> Self {
        Self {
            tick: 0,
            participants: HashMap::new(),
            physics,
            movement: MovementAuthority::new(movement),
        }
    }

    pub fn add_participant(&mut self, id: ConnectionId, look_config: LookConfig) {
        let spawn = Vec3::new(-10.0 + (id as f32 * 3.0) % 20.0, 0.0, -2.0);

        info!(
            "Added participant {} at ({:.1}, {:.1}, {:.1})",
            id, spawn.x, spawn.y, spawn.z
        );
        self.participants
            .insert(id, Participant::new(id, spawn, look_config));
    }

    pub fn remove_participant(&mut self, id: &ConnectionId) -> bool {
        let removed = self.participants.remove(id).is_some();
        if removed {
            info!("Removed participant {}", id);
        }
        removed
    }

    pub fn participant(&self, id: ConnectionId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn physics(&self) -> &StaticWorld {
        &self.physics
    }

    pub fn movement(&self) -> &MovementAuthority {
        &self.movement
    }

    /// Advances every body by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        for participant in self.participants.values_mut() {
            if !self.movement.is_grounded(participant.position, &self.physics) {
                participant.velocity.y -= GRAVITY * dt;
            }

            let moved = participant.position + participant.velocity * dt;
            let (position, velocity) = self
                .physics
                .resolve_penetration(moved, participant.velocity);
            participant.position = position;
            participant.velocity = velocity;
        }

        self.tick = self.tick.wrapping_add(1);
    }

    /// Replicated state of every participant, ordered by id
    pub fn states(&self) -> Vec<ParticipantState> {
        let mut states: Vec<ParticipantState> =
            self.participants.values().map(Participant::state).collect();
        states.sort_by_key(|state| state.id);
        states
    }
}

impl Authority for World {
    fn apply_intent(&mut self, id: ConnectionId, intent: Intent) {
        let Some(participant) = self.participants.get_mut(&id) else {
            debug!("Dropping {:?} for unknown participant {}", intent, id);
            return;
        };

        match intent {
            Intent::Move(movement) => {
                match self.movement.apply(
                    participant.position,
                    participant.velocity,
                    movement.desired_velocity,
                    &self.physics,
                ) {
                    Some(velocity) => participant.velocity = velocity,
                    None => warn!("Rejected non-finite movement from participant {}", id),
                }
            }
            Intent::Look(look) => {
                if !look.delta.is_finite() {
                    warn!("Rejected non-finite look delta from participant {}", id);
                    return;
                }
                if !participant.look_sequencer.accept(look.sequence) {
                    debug!(
                        "Discarding stale look {} from participant {}",
                        look.sequence, id
                    );
                    return;
                }
                participant.look = accumulate_look(
                    participant.look,
                    look.delta,
                    participant.look_config.sensitivity,
                );
            }
            Intent::Fire => {
                participant.shots_fired += 1;
                debug!(
                    "Participant {} fired {:?} (total {})",
                    id, participant.loadout, participant.shots_fired
                );
            }
            Intent::Equip(slot) => {
                participant.loadout = slot;
            }
        }
    }
}
