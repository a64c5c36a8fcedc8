//! Client connection tracking for the authority
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Connection id assignment (monotonic, never reused within a session)
//! - Address to connection id lookup for incoming datagrams
//! - Connection health monitoring and timeout cleanup
//! - Capacity enforcement
//!
//! It deliberately knows nothing about participants or the roster; the
//! server loop turns its add/remove results into lifecycle notifications.

use log::info;
use shared::ConnectionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client and its liveness state
#[derive(Debug)]
pub struct Client {
    /// Unique connection id assigned by the server
    pub id: ConnectionId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Intents received from this client, for monitoring
    pub intents_received: u64,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            intents_received: 0,
        }
    }

    /// Marks the client as alive and counts the intent
    pub fn record_intent(&mut self) {
        self.last_seen = Instant::now();
        self.intents_received += 1;
    }

    /// Returns true if nothing arrived from this client within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Connection ids start at 1; id 0 is reserved for the host's own
/// participant and never handed to a remote client.
pub struct ClientManager {
    clients: HashMap<ConnectionId, Client>,
    next_client_id: ConnectionId,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns the assigned id, or None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<ConnectionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a client. Returns false if they were already gone.
    pub fn remove_client(&mut self, client_id: &ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Finds a client id by network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ConnectionId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Records an intent arrival for liveness. Returns false for unknown ids.
    pub fn record_intent(&mut self, client_id: ConnectionId) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.record_intent();
            true
        } else {
            false
        }
    }

    /// Removes clients that have been silent longer than `timeout`
    ///
    /// Returns the removed ids so the game systems can tear down their state.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<ConnectionId> {
        let timed_out: Vec<ConnectionId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// Connected ids in the order their connections were accepted
    pub fn connected_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All client ids with their addresses, for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(ConnectionId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn get(&self, client_id: ConnectionId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
