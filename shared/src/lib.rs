//! # Shared Movement & Roster Core
//!
//! Everything both the authority and the participants need: the movement
//! and look authorities, the input and physics collaborator interfaces, the
//! intent routing between local application and remote submission, the
//! replicated roster, and the wire protocol.
//!
//! ## Authority model
//!
//! Exactly one node is authoritative for a participant's kinematic state and
//! for the roster. A node that samples input for a participant it is not
//! authoritative for submits intents; the authority runs the same
//! computation on receipt and recomputes anything derived (groundedness)
//! from its own world queries.
//!
//! ## Cadences
//!
//! Movement is tied to the fixed physics tick. Look, equip and fire run on
//! the faster frame tick.

pub mod controller;
pub mod input;
pub mod intent;
pub mod look;
pub mod math;
pub mod movement;
pub mod participant;
pub mod physics;
pub mod protocol;
pub mod roster;

pub use controller::PlayerController;
pub use input::{FrameInput, InputSampler, ScriptedInput};
pub use intent::{
    Authority, Intent, IntentChannel, LookIntent, LookSequencer, MovementIntent, NullChannel,
    Route, Session,
};
pub use look::{accumulate_look, LookConfig, LookState};
pub use math::{Vec2, Vec3};
pub use movement::{MovementAuthority, MovementConfig, Transform};
pub use participant::{ConnectionId, LoadoutSlot, ParticipantState, HOST_CONNECTION_ID};
pub use physics::{Aabb, PhysicsQuery, StaticWorld};
pub use protocol::{Packet, PROTOCOL_VERSION};
pub use roster::{RoomPlayer, Roster, RosterChange, RosterEvent, RosterReplica, RosterSnapshot};

pub const GRAVITY: f32 = 9.81;
pub const PLAYER_SPEED: f32 = 5.0;
pub const COLLIDER_RADIUS: f32 = 0.5;
