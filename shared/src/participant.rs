use crate::look::LookState;
use crate::math::Vec3;
use serde::{Deserialize, Serialize};

/// Transport-assigned connection identity, unique and never reused within a session
pub type ConnectionId = u32;

/// Id of the host's own participant when the authority also plays
pub const HOST_CONNECTION_ID: ConnectionId = 0;

/// Equipped weapon slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadoutSlot {
    #[default]
    Primary,
    Secondary,
}

/// Replicated view of one participant's authoritative state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantState {
    pub id: ConnectionId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub look: LookState,
    pub loadout: LoadoutSlot,
}
