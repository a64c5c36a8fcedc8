//! Server network layer handling UDP communications and the authority loop

use crate::client_manager::ClientManager;
use crate::game::World;
use crate::host::HostPlayer;
use crate::lifecycle::{ConnectionEvent, ConnectionHub};
use crate::roster_service::RosterService;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    Authority, ConnectionId, FrameInput, Intent, LookConfig, MovementConfig, Packet,
    RosterChange, ScriptedInput, StaticWorld, Vec2, HOST_CONNECTION_ID, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Longest simulated step; slower ticks are clamped to it
const MAX_TICK_DELTA: f32 = 0.05;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: ConnectionId },
    Shutdown,
}

/// Messages sent from the authority loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Physics tick length
    pub tick_duration: Duration,
    /// Frame tick length for the host player's look/equip/fire
    pub frame_duration: Duration,
    pub max_clients: usize,
    pub client_timeout: Duration,
    /// Ticks between full roster snapshot broadcasts
    pub roster_resync_ticks: u32,
    /// Whether the server runs its own participant
    pub host_player: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_secs_f64(1.0 / 60.0),
            frame_duration: Duration::from_secs_f64(1.0 / 120.0),
            max_clients: 16,
            client_timeout: Duration::from_secs(5),
            roster_resync_ticks: 120,
            host_player: false,
        }
    }
}

/// Main server coordinating networking and the authoritative world
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    world: World,
    hub: ConnectionHub,
    roster: Option<RosterService>,
    host: Option<HostPlayer<ScriptedInput>>,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: ServerConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let movement = MovementConfig {
            tick_duration: config.tick_duration.as_secs_f32(),
            ..Default::default()
        };
        let mut world = World::new(StaticWorld::arena(), movement);

        let host = if config.host_player {
            Some(HostPlayer::spawn(
                &mut world,
                Self::host_input(),
                LookConfig::default(),
            ))
        } else {
            None
        };

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            world,
            hub: ConnectionHub::new(),
            roster: None,
            host,
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping the loop from outside, e.g. on Ctrl+C
    pub fn shutdown_sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// The host walks forward while slowly turning
    fn host_input() -> ScriptedInput {
        ScriptedInput::looping(
            Vec2::new(0.0, 1.0),
            vec![FrameInput {
                look_delta: Vec2::new(2.0, 0.0),
                capture: true,
                ..Default::default()
            }],
        )
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.client_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Starts the roster from whoever is connected right now
    async fn spawn_roster(&mut self) {
        let mut connected = Vec::new();
        if self.host.is_some() {
            connected.push(HOST_CONNECTION_ID);
        }
        connected.extend(self.clients.read().await.connected_ids());

        let (roster, changes) = RosterService::spawn(&self.hub, connected);
        self.roster = Some(roster);
        self.broadcast_roster_changes(changes);
    }

    /// Applies pending lifecycle events to the roster and ships the results
    fn pump_roster(&mut self) {
        let changes = match self.roster.as_mut() {
            Some(roster) => roster.pump(),
            None => return,
        };
        self.broadcast_roster_changes(changes);
    }

    fn broadcast_roster_changes(&self, changes: Vec<RosterChange>) {
        for change in changes {
            debug!("Roster r{}: {:?}", change.revision(), change.event());
            self.broadcast_packet(Packet::RosterChange(change));
        }
    }

    fn broadcast_roster_snapshot(&self) {
        if let Some(roster) = &self.roster {
            self.broadcast_packet(Packet::RosterSnapshot(roster.snapshot()));
        }
    }

    /// Removes every trace of a connection; safe to call twice
    async fn teardown_client(&mut self, client_id: ConnectionId) {
        self.clients.write().await.remove_client(&client_id);
        if self.world.remove_participant(&client_id) {
            self.hub.notify(ConnectionEvent::Disconnected(client_id));
        }
        self.pump_roster();
    }

    async fn client_for_addr(&self, addr: SocketAddr) -> Option<ConnectionId> {
        self.clients.read().await.find_client_by_addr(addr)
    }

    /// Processes incoming packets and updates the world
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                look_sensitivity,
            } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    warn!(
                        "Rejecting {}: protocol {} != {}",
                        addr, client_version, PROTOCOL_VERSION
                    );
                    let response = Packet::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_packet(response, addr);
                    return;
                }

                // Reconnect from the same address is a fresh membership
                if let Some(existing_id) = self.client_for_addr(addr).await {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.teardown_client(existing_id).await;
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match client_id {
                    Some(client_id) => {
                        self.world
                            .add_participant(client_id, LookConfig::new(look_sensitivity));
                        self.hub.notify(ConnectionEvent::Connected(client_id));

                        self.send_packet(Packet::Connected { client_id }, addr);
                        self.pump_roster();
                        if let Some(roster) = &self.roster {
                            self.send_packet(Packet::RosterSnapshot(roster.snapshot()), addr);
                        }
                    }
                    None => {
                        warn!("Server full, rejecting {}", addr);
                        let response = Packet::Disconnected {
                            reason: "Server full".to_string(),
                        };
                        self.send_packet(response, addr);
                    }
                }
            }

            Packet::Intent {
                participant,
                intent,
            } => {
                let Some(client_id) = self.client_for_addr(addr).await else {
                    debug!("Dropping intent from unknown address {}", addr);
                    return;
                };

                if participant != client_id {
                    warn!(
                        "Client {} submitted intent for participant {}, dropping",
                        client_id, participant
                    );
                    return;
                }

                self.clients.write().await.record_intent(client_id);
                self.apply_remote_intent(client_id, intent);
            }

            Packet::Disconnect => {
                if let Some(client_id) = self.client_for_addr(addr).await {
                    self.teardown_client(client_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Remote intents reach the same authority the host's own intents do
    fn apply_remote_intent(&mut self, client_id: ConnectionId, intent: Intent) {
        self.world.apply_intent(client_id, intent);
    }

    /// Advances the world one physics tick and publishes the result
    async fn tick(&mut self, mut dt: f32) {
        if dt > MAX_TICK_DELTA {
            warn!(
                "Large delta time detected ({:.3}s), capping to {:.3}s",
                dt, MAX_TICK_DELTA
            );
            dt = MAX_TICK_DELTA;
        }

        if let Some(host) = self.host.as_mut() {
            host.fixed(&mut self.world);
        }
        self.world.step(dt);

        let client_count = self.clients.read().await.len();
        if client_count == 0 {
            return;
        }

        self.broadcast_world_state();

        let resync = self.config.roster_resync_ticks;
        if resync > 0 && self.world.tick % resync == 0 {
            self.broadcast_roster_snapshot();
        }

        if self.world.tick % 60 == 0 {
            debug!(
                "Tick {}: {} clients, {} participants, {:.1}Hz",
                self.world.tick,
                client_count,
                self.world.len(),
                1.0 / dt
            );
        }
    }

    fn broadcast_world_state(&self) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let timestamp_safe = (timestamp.min(u64::MAX as u128)) as u64;

        let packet = Packet::WorldState {
            tick: self.world.tick,
            timestamp: timestamp_safe,
            participants: self.world.states(),
        };

        self.broadcast_packet(packet);
    }

    /// Tells every client the session is over and releases the roster
    async fn shutdown(&mut self) {
        let mut final_packets = Vec::new();
        if let Some(roster) = self.roster.take() {
            if let Some(change) = roster.despawn() {
                final_packets.push(Packet::RosterChange(change));
            }
        }
        final_packets.push(Packet::Disconnected {
            reason: "Server shutting down".to_string(),
        });

        // Sent inline: the sender task may not get another turn
        let client_addrs = self.clients.read().await.get_client_addrs();
        for packet in &final_packets {
            for (client_id, addr) in &client_addrs {
                if let Err(e) = Self::send_packet_impl(&self.socket, packet, *addr).await {
                    error!("Failed to notify client {} of shutdown: {}", client_id, e);
                }
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;
        self.spawn_roster().await;

        let mut tick_interval = interval(self.config.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frame_interval = interval(self.config.frame_duration);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.teardown_client(client_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Physics tick
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.tick(dt).await;
                },

                // Host frame tick
                _ = frame_interval.tick(), if self.host.is_some() => {
                    if let Some(host) = self.host.as_mut() {
                        host.frame(&mut self.world);
                    }
                },
            }
        }

        self.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{LoadoutSlot, MovementIntent, RoomPlayer, RosterEvent, Vec3};
    use std::net::{IpAddr, Ipv4Addr};

    fn client_addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn connect_packet() -> Packet {
        Packet::Connect {
            client_version: PROTOCOL_VERSION,
            look_sensitivity: 0.1,
        }
    }

    async fn test_server(config: ServerConfig) -> Server {
        let mut server = tokio_test::assert_ok!(Server::new("127.0.0.1:0", config).await);
        server.spawn_roster().await;
        server
    }

    /// Everything queued for the sender task so far
    fn outgoing(server: &mut Server) -> Vec<GameMessage> {
        std::iter::from_fn(|| server.game_rx.try_recv().ok()).collect()
    }

    fn sent_to(messages: &[GameMessage], target: SocketAddr) -> Vec<Packet> {
        messages
            .iter()
            .filter_map(|message| match message {
                GameMessage::SendPacket { packet, addr } if *addr == target => {
                    Some(packet.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_connect_assigns_id_and_sends_snapshot() {
        let mut server = test_server(ServerConfig::default()).await;
        let addr = client_addr(9001);

        server.handle_packet(connect_packet(), addr).await;

        let messages = outgoing(&mut server);
        let direct = sent_to(&messages, addr);
        assert_eq!(direct[0], Packet::Connected { client_id: 1 });
        match &direct[1] {
            Packet::RosterSnapshot(snapshot) => {
                assert_eq!(snapshot.players().len(), 1);
                assert_eq!(snapshot.players()[0].id, 1);
            }
            other => panic!("Expected roster snapshot, got {:?}", other),
        }
        assert!(server.world().participant(1).is_some());
    }

    #[tokio::test]
    async fn test_connect_with_wrong_version_rejected() {
        let mut server = test_server(ServerConfig::default()).await;
        let addr = client_addr(9002);

        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION + 1,
                    look_sensitivity: 0.1,
                },
                addr,
            )
            .await;

        let direct = sent_to(&outgoing(&mut server), addr);
        assert_eq!(
            direct,
            vec![Packet::Disconnected {
                reason: "Protocol version mismatch".to_string()
            }]
        );
        assert!(server.world().is_empty());
    }

    #[tokio::test]
    async fn test_connect_when_full_rejected() {
        let mut server = test_server(ServerConfig {
            max_clients: 1,
            ..Default::default()
        })
        .await;

        server.handle_packet(connect_packet(), client_addr(9003)).await;
        server.handle_packet(connect_packet(), client_addr(9004)).await;

        let direct = sent_to(&outgoing(&mut server), client_addr(9004));
        assert_eq!(
            direct,
            vec![Packet::Disconnected {
                reason: "Server full".to_string()
            }]
        );
        assert_eq!(server.world().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_previous_membership() {
        let mut server = test_server(ServerConfig::default()).await;
        let addr = client_addr(9005);

        server.handle_packet(connect_packet(), addr).await;
        server.handle_packet(connect_packet(), addr).await;

        assert!(server.world().participant(1).is_none());
        assert!(server.world().participant(2).is_some());
        let roster = server.roster.as_ref().unwrap().roster();
        assert!(!roster.contains(1));
        assert!(roster.contains(2));
    }

    #[tokio::test]
    async fn test_intent_applied_for_bound_participant() {
        let mut server = test_server(ServerConfig::default()).await;
        let addr = client_addr(9006);
        server.handle_packet(connect_packet(), addr).await;

        server
            .handle_packet(
                Packet::Intent {
                    participant: 1,
                    intent: Intent::Move(MovementIntent {
                        desired_velocity: Vec3::new(5.0, 0.0, 0.0),
                    }),
                },
                addr,
            )
            .await;

        assert_eq!(
            server.world().participant(1).unwrap().velocity,
            Vec3::new(5.0, 0.0, 0.0)
        );
        assert_eq!(
            server.clients.read().await.get(1).unwrap().intents_received,
            1
        );
    }

    #[tokio::test]
    async fn test_intent_for_other_participant_dropped() {
        let mut server = test_server(ServerConfig::default()).await;
        server.handle_packet(connect_packet(), client_addr(9007)).await;
        server.handle_packet(connect_packet(), client_addr(9008)).await;

        // Client 2 tries to equip on behalf of client 1
        server
            .handle_packet(
                Packet::Intent {
                    participant: 1,
                    intent: Intent::Equip(LoadoutSlot::Secondary),
                },
                client_addr(9008),
            )
            .await;

        assert_eq!(
            server.world().participant(1).unwrap().loadout,
            LoadoutSlot::Primary
        );
    }

    #[tokio::test]
    async fn test_intent_from_unknown_address_dropped() {
        let mut server = test_server(ServerConfig::default()).await;

        server
            .handle_packet(
                Packet::Intent {
                    participant: 1,
                    intent: Intent::Fire,
                },
                client_addr(9009),
            )
            .await;

        assert!(server.world().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_tears_down_and_broadcasts_removal() {
        let mut server = test_server(ServerConfig::default()).await;
        let addr = client_addr(9010);
        server.handle_packet(connect_packet(), addr).await;
        outgoing(&mut server);

        server.handle_packet(Packet::Disconnect, addr).await;

        assert!(server.world().is_empty());
        assert!(server.clients.read().await.is_empty());

        let removals: Vec<RosterEvent> = outgoing(&mut server)
            .into_iter()
            .filter_map(|message| match message {
                GameMessage::BroadcastPacket {
                    packet: Packet::RosterChange(change),
                } => Some(change.event()),
                _ => None,
            })
            .collect();
        assert_eq!(removals, vec![RosterEvent::Removed(RoomPlayer::new(1))]);
    }

    #[tokio::test]
    async fn test_host_player_is_in_roster() {
        let server = test_server(ServerConfig {
            host_player: true,
            ..Default::default()
        })
        .await;

        assert!(server
            .roster
            .as_ref()
            .unwrap()
            .roster()
            .contains(HOST_CONNECTION_ID));
        assert!(server.world().participant(HOST_CONNECTION_ID).is_some());
    }

    #[tokio::test]
    async fn test_tick_caps_delta_and_broadcasts_state() {
        let mut server = test_server(ServerConfig::default()).await;
        server.handle_packet(connect_packet(), client_addr(9011)).await;
        server.apply_remote_intent(
            1,
            Intent::Move(MovementIntent {
                desired_velocity: Vec3::new(5.0, 0.0, 0.0),
            }),
        );
        let start = server.world().participant(1).unwrap().position;
        outgoing(&mut server);

        server.tick(2.0).await;

        let moved = server.world().participant(1).unwrap().position.x - start.x;
        assert!((moved - 5.0 * MAX_TICK_DELTA).abs() < 1e-4);

        let world_states = outgoing(&mut server)
            .into_iter()
            .filter(|message| {
                matches!(
                    message,
                    GameMessage::BroadcastPacket {
                        packet: Packet::WorldState { .. },
                    }
                )
            })
            .count();
        assert_eq!(world_states, 1);
    }
}
