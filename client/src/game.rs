use log::debug;
use shared::{
    ConnectionId, ParticipantState, RosterChange, RosterReplica, RosterSnapshot, Vec3,
};
use std::collections::HashMap;

/// What this node has observed of the authority's state
///
/// Everything here is written only by packets from the authority. The local
/// participant's predicted look lives in its controller, not here.
#[derive(Debug, Default)]
pub struct ClientGameState {
    pub roster: RosterReplica,
    participants: HashMap<ConnectionId, ParticipantState>,
    last_tick: Option<u32>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything, e.g. after (re)connecting to a new session
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Mirrors a world state broadcast. Returns false for a stale tick.
    pub fn apply_world_state(&mut self, tick: u32, participants: Vec<ParticipantState>) -> bool {
        if let Some(last) = self.last_tick {
            if tick <= last {
                debug!("Ignoring stale world state {} (have {})", tick, last);
                return false;
            }
        }

        self.last_tick = Some(tick);
        self.participants = participants
            .into_iter()
            .map(|state| (state.id, state))
            .collect();
        true
    }

    pub fn apply_roster_change(&mut self, change: RosterChange) -> bool {
        self.roster.apply_change(change)
    }

    pub fn apply_roster_snapshot(&mut self, snapshot: RosterSnapshot) -> bool {
        self.roster.apply_snapshot(snapshot)
    }

    pub fn participant(&self, id: ConnectionId) -> Option<&ParticipantState> {
        self.participants.get(&id)
    }

    pub fn position_of(&self, id: ConnectionId) -> Option<Vec3> {
        self.participant(id).map(|state| state.position)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn last_tick(&self) -> Option<u32> {
        self.last_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{LoadoutSlot, LookState, Roster};

    fn state(id: ConnectionId, x: f32) -> ParticipantState {
        ParticipantState {
            id,
            position: Vec3::new(x, 0.0, 0.0),
            velocity: Vec3::ZERO,
            look: LookState::default(),
            loadout: LoadoutSlot::Primary,
        }
    }

    #[test]
    fn test_world_state_mirrored() {
        let mut game = ClientGameState::new();

        assert!(game.apply_world_state(1, vec![state(1, 2.0), state(2, -3.0)]));

        assert_eq!(game.participant_count(), 2);
        assert_eq!(game.position_of(2), Some(Vec3::new(-3.0, 0.0, 0.0)));
        assert_eq!(game.position_of(9), None);
    }

    #[test]
    fn test_stale_world_state_ignored() {
        let mut game = ClientGameState::new();
        game.apply_world_state(5, vec![state(1, 5.0)]);

        assert!(!game.apply_world_state(4, vec![state(1, 4.0)]));
        assert!(!game.apply_world_state(5, vec![state(1, 4.0)]));

        assert_eq!(game.position_of(1), Some(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(game.last_tick(), Some(5));
    }

    #[test]
    fn test_departed_participant_disappears() {
        let mut game = ClientGameState::new();
        game.apply_world_state(1, vec![state(1, 0.0), state(2, 0.0)]);
        game.apply_world_state(2, vec![state(2, 0.0)]);

        assert!(game.participant(1).is_none());
    }

    #[test]
    fn test_roster_follows_authority() {
        let mut authority = Roster::new();
        let mut game = ClientGameState::new();

        let first = authority.add(1).unwrap();
        let second = authority.add(2).unwrap();

        // Second arrives first and waits for the gap
        assert!(!game.apply_roster_change(second));
        assert!(game.apply_roster_change(first));

        let ids: Vec<ConnectionId> = game.roster.players().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_reset_forgets_session() {
        let mut game = ClientGameState::new();
        game.apply_world_state(10, vec![state(1, 0.0)]);
        game.apply_roster_snapshot(Roster::new().snapshot());

        game.reset();

        assert_eq!(game.last_tick(), None);
        assert!(game.apply_world_state(1, vec![]));
    }
}
