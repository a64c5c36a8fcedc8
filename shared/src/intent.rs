//! Intents and the routing between local application and remote submission
//!
//! A node decides per participant whether it is the authority
//! ([`Session::is_authority_for`]). [`Route`] then either hands the intent to
//! the in-process [`Authority`] or to an [`IntentChannel`] towards the remote
//! authority. There is exactly one authority implementation behind both paths.

use crate::math::{Vec2, Vec3};
use crate::participant::{ConnectionId, LoadoutSlot};
use serde::{Deserialize, Serialize};

/// Velocity a participant asks the authority to adopt this physics tick
///
/// Carries no sequence number: the latest one received wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementIntent {
    pub desired_velocity: Vec3,
}

/// Raw look delta for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookIntent {
    /// Strictly increasing per participant
    pub sequence: u64,
    pub delta: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    Move(MovementIntent),
    Look(LookIntent),
    Fire,
    Equip(LoadoutSlot),
}

/// The authoritative side of intent application
pub trait Authority {
    fn apply_intent(&mut self, participant: ConnectionId, intent: Intent);
}

/// Fire-and-forget submission towards the remote authority
///
/// Implementations never report failure; an intent that cannot be delivered
/// is dropped.
pub trait IntentChannel {
    fn submit(&self, participant: ConnectionId, intent: Intent);
}

/// Transport/session view of who owns which participant
pub trait Session {
    fn is_authority_for(&self, participant: ConnectionId) -> bool;
}

/// Channel that drops everything, for nodes that never submit remotely
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChannel;

impl IntentChannel for NullChannel {
    fn submit(&self, _participant: ConnectionId, _intent: Intent) {}
}

/// Where a participant's intents go this tick
pub enum Route<'a> {
    Local(&'a mut dyn Authority),
    Remote(&'a dyn IntentChannel),
}

impl<'a> Route<'a> {
    /// Picks the local authority when the session says this node owns the
    /// participant and an authority is available, the channel otherwise.
    pub fn select(
        session: &dyn Session,
        participant: ConnectionId,
        local: Option<&'a mut dyn Authority>,
        remote: &'a dyn IntentChannel,
    ) -> Route<'a> {
        match local {
            Some(authority) if session.is_authority_for(participant) => Route::Local(authority),
            _ => Route::Remote(remote),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Route::Local(_))
    }

    pub fn send(&mut self, participant: ConnectionId, intent: Intent) {
        match self {
            Route::Local(authority) => authority.apply_intent(participant, intent),
            Route::Remote(channel) => channel.submit(participant, intent),
        }
    }
}

/// Authority-side filter for look intents
///
/// Accepts only sequences newer than the last accepted one, so duplicated or
/// reordered datagrams cannot rewind a participant's orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookSequencer {
    last_accepted: Option<u64>,
}

impl LookSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records `sequence` if it is newer than anything seen
    pub fn accept(&mut self, sequence: u64) -> bool {
        match self.last_accepted {
            Some(last) if sequence <= last => false,
            _ => {
                self.last_accepted = Some(sequence);
                true
            }
        }
    }

    pub fn last_accepted(&self) -> Option<u64> {
        self.last_accepted
    }
}
