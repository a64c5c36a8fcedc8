//! Roster of connected participants
//!
//! The authority owns a [`Roster`] and is the only place membership can be
//! mutated. Every effective mutation produces a [`RosterChange`] stamped with
//! the next revision; observers feed those (and periodic [`RosterSnapshot`]s)
//! into a [`RosterReplica`], which exposes a read-only ordered view and has
//! no way to add or remove entries on its own.

use crate::participant::ConnectionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Out-of-order changes a replica will hold while waiting for a gap to fill
pub const MAX_PENDING_CHANGES: usize = 256;

/// Roster entry; equality is by connection id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomPlayer {
    pub id: ConnectionId,
}

impl RoomPlayer {
    pub fn new(id: ConnectionId) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterEvent {
    Added(RoomPlayer),
    Removed(RoomPlayer),
    Cleared,
}

/// One ordered mutation, as broadcast to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterChange {
    revision: u64,
    event: RosterEvent,
}

impl RosterChange {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn event(&self) -> RosterEvent {
        self.event
    }
}

/// Full roster contents at a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    revision: u64,
    players: Vec<RoomPlayer>,
}

impl RosterSnapshot {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn players(&self) -> &[RoomPlayer] {
        &self.players
    }
}

/// Authority-side roster in connection-accept order
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<RoomPlayer>,
    revision: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` unless it is already present
    pub fn add(&mut self, id: ConnectionId) -> Option<RosterChange> {
        if self.contains(id) {
            return None;
        }

        let player = RoomPlayer::new(id);
        self.players.push(player);
        Some(self.record(RosterEvent::Added(player)))
    }

    /// Removes `id`; unknown ids are a no-op
    pub fn remove(&mut self, id: ConnectionId) -> Option<RosterChange> {
        let index = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.remove(index);
        Some(self.record(RosterEvent::Removed(player)))
    }

    pub fn clear(&mut self) -> Option<RosterChange> {
        if self.players.is_empty() {
            return None;
        }

        self.players.clear();
        Some(self.record(RosterEvent::Cleared))
    }

    /// Clears and repopulates from the transport's connected set, in order
    pub fn bootstrap<I>(&mut self, connected: I) -> Vec<RosterChange>
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        let mut changes: Vec<RosterChange> = self.clear().into_iter().collect();
        changes.extend(connected.into_iter().filter_map(|id| self.add(id)));
        changes
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            revision: self.revision,
            players: self.players.clone(),
        }
    }

    pub fn players(&self) -> &[RoomPlayer] {
        &self.players
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn record(&mut self, event: RosterEvent) -> RosterChange {
        self.revision += 1;
        RosterChange {
            revision: self.revision,
            event,
        }
    }
}

/// Observer-side mirror of the authority's roster
#[derive(Debug, Clone, Default)]
pub struct RosterReplica {
    players: Vec<RoomPlayer>,
    revision: u64,
    pending: BTreeMap<u64, RosterEvent>,
}

impl RosterReplica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `change` if it is the next revision, buffers it if it is
    /// ahead, ignores it if it is old. Returns true when the view advanced.
    pub fn apply_change(&mut self, change: RosterChange) -> bool {
        if change.revision <= self.revision {
            return false;
        }

        if change.revision > self.revision + 1 {
            if self.pending.len() < MAX_PENDING_CHANGES {
                self.pending.insert(change.revision, change.event);
            }
            return false;
        }

        self.apply_event(change.event);
        self.revision = change.revision;
        self.drain_pending();
        true
    }

    /// Adopts a snapshot newer than the current view
    pub fn apply_snapshot(&mut self, snapshot: RosterSnapshot) -> bool {
        if snapshot.revision <= self.revision && self.revision != 0 {
            return false;
        }

        self.players = snapshot.players;
        self.revision = snapshot.revision;
        let revision = self.revision;
        self.pending.retain(|r, _| *r > revision);
        self.drain_pending();
        true
    }

    pub fn players(&self) -> &[RoomPlayer] {
        &self.players
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of buffered changes waiting on a missing revision
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn drain_pending(&mut self) {
        while let Some(event) = self.pending.remove(&(self.revision + 1)) {
            self.apply_event(event);
            self.revision += 1;
        }
    }

    fn apply_event(&mut self, event: RosterEvent) {
        match event {
            RosterEvent::Added(player) => {
                if !self.contains(player.id) {
                    self.players.push(player);
                }
            }
            RosterEvent::Removed(player) => self.players.retain(|p| *p != player),
            RosterEvent::Cleared => self.players.clear(),
        }
    }
}
