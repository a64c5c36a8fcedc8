//! Authority-side roster component
//!
//! One [`RosterService`] exists per network session. The server constructs
//! it when it starts serving and hands it nothing but the lifecycle hub and
//! the transport's current connected set; there is no global instance.

use crate::lifecycle::{ConnectionEvent, ConnectionHub, Subscription};
use log::{debug, info};
use shared::{ConnectionId, Roster, RosterChange, RosterSnapshot};

pub struct RosterService {
    roster: Roster,
    subscription: Subscription,
}

impl RosterService {
    /// Starts tracking membership
    ///
    /// Subscribes before reading the snapshot so no connection can slip
    /// between the two; duplicates that result are absorbed by the roster.
    /// Returns the changes the bootstrap produced, for broadcasting.
    pub fn spawn<I>(hub: &ConnectionHub, connected: I) -> (Self, Vec<RosterChange>)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        let subscription = hub.subscribe();
        let mut roster = Roster::new();
        let changes = roster.bootstrap(connected);

        info!("Roster spawned with {} participants", roster.len());

        (
            Self {
                roster,
                subscription,
            },
            changes,
        )
    }

    /// Applies every queued lifecycle event
    pub fn pump(&mut self) -> Vec<RosterChange> {
        self.subscription
            .drain()
            .into_iter()
            .filter_map(|event| self.handle(event))
            .collect()
    }

    pub fn handle(&mut self, event: ConnectionEvent) -> Option<RosterChange> {
        let change = match event {
            ConnectionEvent::Connected(id) => self.roster.add(id),
            ConnectionEvent::Disconnected(id) => self.roster.remove(id),
        };

        if change.is_none() {
            debug!("Roster ignored redundant {:?}", event);
        }
        change
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        self.roster.snapshot()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Tears the component down: unsubscribes and clears the roster
    ///
    /// Returns the final clear for observers, if there was anything to clear.
    pub fn despawn(mut self) -> Option<RosterChange> {
        let change = self.roster.clear();
        info!("Roster despawned");
        change
    }
}
