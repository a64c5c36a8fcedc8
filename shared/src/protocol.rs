use crate::intent::Intent;
use crate::participant::{ConnectionId, ParticipantState};
use crate::roster::{RosterChange, RosterSnapshot};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

/// Every datagram exchanged between authority and participants
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
        look_sensitivity: f32,
    },
    Intent {
        participant: ConnectionId,
        intent: Intent,
    },
    Disconnect,

    // Server -> client
    Connected {
        client_id: ConnectionId,
    },
    Disconnected {
        reason: String,
    },
    WorldState {
        tick: u32,
        timestamp: u64,
        participants: Vec<ParticipantState>,
    },
    RosterSnapshot(RosterSnapshot),
    RosterChange(RosterChange),
}
