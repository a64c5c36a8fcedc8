use crate::game::ClientGameState;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    ConnectionId, InputSampler, Intent, IntentChannel, LookConfig, MovementConfig, Packet,
    PlayerController, Route, Session, StaticWorld, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// How long to wait for `Connected` before asking again
const CONNECT_RETRY: Duration = Duration::from_secs(1);

/// Session view of a participant node: the server is the authority for
/// everyone, including this node's own participant.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverSession;

impl Session for ObserverSession {
    fn is_authority_for(&self, _participant: ConnectionId) -> bool {
        false
    }
}

/// Queues intents for the sender task; never blocks, never fails
#[derive(Debug, Clone)]
pub struct UdpIntentChannel {
    outgoing: mpsc::UnboundedSender<Packet>,
}

impl UdpIntentChannel {
    pub fn new(outgoing: mpsc::UnboundedSender<Packet>) -> Self {
        Self { outgoing }
    }
}

impl IntentChannel for UdpIntentChannel {
    fn submit(&self, participant: ConnectionId, intent: Intent) {
        if self
            .outgoing
            .send(Packet::Intent {
                participant,
                intent,
            })
            .is_err()
        {
            debug!("Sender gone, dropping {:?}", intent);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub tick_duration: Duration,
    pub frame_duration: Duration,
    pub look_sensitivity: f32,
    /// Simulated round trip; half is added on each direction
    pub fake_ping_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_secs_f64(1.0 / 60.0),
            frame_duration: Duration::from_secs_f64(1.0 / 120.0),
            look_sensitivity: LookConfig::default().sensitivity,
            fake_ping_ms: 0,
        }
    }
}

pub struct Client {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    client_id: Option<ConnectionId>,
    connected: bool,
    session_over: bool,
    last_connect_attempt: Option<Instant>,

    game_state: ClientGameState,
    controller: Option<PlayerController>,
    input: Box<dyn InputSampler + Send>,
    physics: StaticWorld,
    config: ClientConfig,

    channel: UdpIntentChannel,
    outgoing_rx: Option<mpsc::UnboundedReceiver<Packet>>,
    ping_ms: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        input: Box<dyn InputSampler + Send>,
        config: ClientConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        let server_addr = server_addr.parse()?;
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            session_over: false,
            last_connect_attempt: None,
            game_state: ClientGameState::new(),
            controller: None,
            input,
            physics: StaticWorld::arena(),
            config,
            channel: UdpIntentChannel::new(outgoing_tx),
            outgoing_rx: Some(outgoing_rx),
            ping_ms: 0,
        })
    }

    pub fn client_id(&self) -> Option<ConnectionId> {
        self.client_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn controller(&self) -> Option<&PlayerController> {
        self.controller.as_ref()
    }

    /// Spawns task that drains the outgoing queue onto the socket
    fn spawn_sender(&mut self) {
        let Some(mut outgoing_rx) = self.outgoing_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);
        let server_addr = self.server_addr;
        let fake_ping_ms = self.config.fake_ping_ms;

        tokio::spawn(async move {
            while let Some(packet) = outgoing_rx.recv().await {
                if fake_ping_ms > 0 {
                    sleep(Duration::from_millis(fake_ping_ms / 2)).await;
                }

                match serialize(&packet) {
                    Ok(data) => {
                        if let Err(e) = socket.send_to(&data, server_addr).await {
                            error!("Failed to send packet: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to serialize packet: {}", e),
                }
            }
        });
    }

    fn connect(&mut self) {
        info!("Connecting to server at {}...", self.server_addr);
        self.last_connect_attempt = Some(Instant::now());

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            look_sensitivity: self.config.look_sensitivity,
        };
        if self.channel.outgoing.send(packet).is_err() {
            error!("Sender task is gone, cannot connect");
        }
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
                self.game_state.reset();

                let movement = MovementConfig {
                    tick_duration: self.config.tick_duration.as_secs_f32(),
                    ..Default::default()
                };
                self.controller = Some(PlayerController::new(
                    client_id,
                    movement,
                    LookConfig::new(self.config.look_sensitivity),
                ));
            }

            Packet::WorldState {
                tick,
                timestamp,
                participants,
            } => {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_millis() as u64;

                if timestamp > 0 {
                    self.ping_ms = now.saturating_sub(timestamp);
                }

                self.game_state.apply_world_state(tick, participants);
            }

            Packet::RosterSnapshot(snapshot) => {
                if self.game_state.apply_roster_snapshot(snapshot) {
                    debug!(
                        "Roster resynced at r{} ({} players)",
                        self.game_state.roster.revision(),
                        self.game_state.roster.len()
                    );
                }
            }

            Packet::RosterChange(change) => {
                if self.game_state.apply_roster_change(change) {
                    info!(
                        "Roster r{}: {} players",
                        self.game_state.roster.revision(),
                        self.game_state.roster.len()
                    );
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
                self.controller = None;
                self.session_over = true;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Frame cadence: look, equip, fire, capture
    fn frame_tick(&mut self) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };

        let frame = self.input.sample_frame();
        let mut route = Route::select(&ObserverSession, controller.id(), None, &self.channel);
        controller.update_frame(&frame, &mut route);
    }

    /// Physics cadence: movement from the last observed position
    fn physics_tick(&mut self) {
        if !self.connected {
            let retry = self
                .last_connect_attempt
                .map_or(true, |at| at.elapsed() >= CONNECT_RETRY);
            if retry {
                self.connect();
            }
            return;
        }

        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let Some(position) = self.game_state.position_of(controller.id()) else {
            return;
        };

        let move_axis = self.input.move_axis();
        let mut route = Route::select(&ObserverSession, controller.id(), None, &self.channel);
        controller.update_fixed(move_axis, position, &self.physics, &mut route);
    }

    fn log_status(&self) {
        let Some(client_id) = self.client_id else {
            return;
        };

        if let Some(state) = self.game_state.participant(client_id) {
            info!(
                "Participant {} at ({:.2}, {:.2}, {:.2}) yaw {:.1} {:?}, {} in roster, {} visible, ping {}ms",
                client_id,
                state.position.x,
                state.position.y,
                state.position.z,
                state.look.yaw,
                state.loadout,
                self.game_state.roster.len(),
                self.game_state.participant_count(),
                self.ping_ms
            );
        }
    }

    /// Runs until Ctrl+C or until the server ends the session
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(None).await
    }

    /// Runs for at most `duration`
    pub async fn run_for(&mut self, duration: Duration) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(Some(tokio::time::Instant::now() + duration))
            .await
    }

    async fn run_until(
        &mut self,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_sender();
        self.connect();

        let mut frame_interval = interval(self.config.frame_duration);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut physics_interval = interval(self.config.tick_duration);
        physics_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_interval = interval(Duration::from_secs(2));

        let stop_at = deadline.unwrap_or_else(tokio::time::Instant::now);
        let mut buffer = [0u8; 2048];

        while !self.session_over {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) => {
                            if addr != self.server_addr {
                                debug!("Ignoring datagram from {}", addr);
                                continue;
                            }

                            if self.config.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.config.fake_ping_ms / 2)).await;
                            }

                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => self.handle_packet(packet).await,
                                Err(e) => warn!("Failed to deserialize packet: {}", e),
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = frame_interval.tick() => {
                    self.frame_tick();
                },

                _ = physics_interval.tick() => {
                    self.physics_tick();
                },

                _ = status_interval.tick() => {
                    self.log_status();
                },

                _ = tokio::time::sleep_until(stop_at), if deadline.is_some() => {
                    break;
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, disconnecting...");
                    break;
                },
            }
        }

        if self.connected {
            let data = serialize(&Packet::Disconnect)?;
            self.socket.send_to(&data, self.server_addr).await?;
            self.connected = false;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{FrameInput, LoadoutSlot, ScriptedInput, Vec2};

    async fn test_client(input: ScriptedInput) -> Client {
        tokio_test::assert_ok!(
            Client::new("127.0.0.1:9", Box::new(input), ClientConfig::default()).await
        )
    }

    fn drain(client: &mut Client) -> Vec<Packet> {
        let rx = client.outgoing_rx.as_mut().unwrap();
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_observer_session_owns_nobody() {
        assert!(!ObserverSession.is_authority_for(0));
        assert!(!ObserverSession.is_authority_for(3));
    }

    #[test]
    fn test_intent_channel_wraps_packets() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = UdpIntentChannel::new(tx);

        channel.submit(4, Intent::Fire);

        assert_eq!(
            rx.try_recv().unwrap(),
            Packet::Intent {
                participant: 4,
                intent: Intent::Fire
            }
        );
    }

    #[test]
    fn test_intent_channel_drops_silently_when_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        UdpIntentChannel::new(tx).submit(1, Intent::Fire);
    }

    #[tokio::test]
    async fn test_connected_creates_controller() {
        let mut client = test_client(ScriptedInput::new(Vec2::ZERO)).await;

        client.handle_packet(Packet::Connected { client_id: 7 }).await;

        assert!(client.is_connected());
        assert_eq!(client.client_id(), Some(7));
        assert_eq!(client.controller().unwrap().id(), 7);
    }

    #[tokio::test]
    async fn test_frame_tick_submits_through_channel() {
        let mut input = ScriptedInput::new(Vec2::ZERO);
        input.push_frame(FrameInput {
            capture: true,
            equip_secondary: true,
            fire: true,
            ..Default::default()
        });
        let mut client = test_client(input).await;
        client.handle_packet(Packet::Connected { client_id: 2 }).await;

        client.frame_tick();

        assert_eq!(
            drain(&mut client),
            vec![
                Packet::Intent {
                    participant: 2,
                    intent: Intent::Equip(LoadoutSlot::Secondary)
                },
                Packet::Intent {
                    participant: 2,
                    intent: Intent::Fire
                },
            ]
        );
        // Prediction is local only
        assert_eq!(
            client.controller().unwrap().loadout(),
            LoadoutSlot::Secondary
        );
    }

    #[tokio::test]
    async fn test_physics_tick_waits_for_observed_position() {
        let mut client = test_client(ScriptedInput::new(Vec2::new(1.0, 0.0))).await;
        client.handle_packet(Packet::Connected { client_id: 1 }).await;

        client.physics_tick();
        assert!(drain(&mut client).is_empty());

        client
            .handle_packet(Packet::WorldState {
                tick: 1,
                timestamp: 0,
                participants: vec![shared::ParticipantState {
                    id: 1,
                    position: shared::Vec3::new(0.0, 0.0, 0.0),
                    velocity: shared::Vec3::ZERO,
                    look: Default::default(),
                    loadout: LoadoutSlot::Primary,
                }],
            })
            .await;
        client.physics_tick();

        match drain(&mut client).as_slice() {
            [Packet::Intent {
                participant: 1,
                intent: Intent::Move(movement),
            }] => {
                assert!((movement.desired_velocity.x - 5.0).abs() < 1e-4);
            }
            other => panic!("Expected one movement intent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnected_ends_session() {
        let mut client = test_client(ScriptedInput::new(Vec2::ZERO)).await;
        client.handle_packet(Packet::Connected { client_id: 1 }).await;

        client
            .handle_packet(Packet::Disconnected {
                reason: "Server shutting down".to_string(),
            })
            .await;

        assert!(!client.is_connected());
        assert!(client.controller().is_none());
        assert!(client.session_over);
    }

    #[tokio::test]
    async fn test_physics_tick_retries_connect() {
        let mut client = test_client(ScriptedInput::new(Vec2::ZERO)).await;

        client.physics_tick();
        client.physics_tick();

        // Second tick is within the retry window
        let connects = drain(&mut client)
            .into_iter()
            .filter(|packet| matches!(packet, Packet::Connect { .. }))
            .count();
        assert_eq!(connects, 1);
    }
}
