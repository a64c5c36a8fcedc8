//! The server's own participant
//!
//! When the server is started with a host player it is both the authority and
//! a participant. The host's controller runs against the same [`World`] the
//! remote intents land in, so its intents take the local route.

use crate::game::World;
use log::info;
use shared::{
    Authority, ConnectionId, InputSampler, IntentChannel, LookConfig, NullChannel,
    PlayerController, Route, Session, HOST_CONNECTION_ID,
};

/// Session view of the authority node: it owns every participant
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthoritySession;

impl Session for AuthoritySession {
    fn is_authority_for(&self, _participant: ConnectionId) -> bool {
        true
    }
}

pub struct HostPlayer<S: InputSampler> {
    controller: PlayerController,
    input: S,
}

impl<S: InputSampler> HostPlayer<S> {
    /// Creates the host participant and registers it with the world
    pub fn spawn(world: &mut World, input: S, look_config: LookConfig) -> Self {
        let movement = world.movement().config;
        world.add_participant(HOST_CONNECTION_ID, look_config);
        info!("Host player joined as participant {}", HOST_CONNECTION_ID);

        Self {
            controller: PlayerController::new(HOST_CONNECTION_ID, movement, look_config),
            input,
        }
    }

    /// Frame-rate step: look, equip, fire
    pub fn frame(&mut self, world: &mut World) {
        let frame = self.input.sample_frame();
        let mut route = Self::route(world);
        self.controller.update_frame(&frame, &mut route);
    }

    /// Physics-rate step: movement from the host's current position
    pub fn fixed(&mut self, world: &mut World) {
        let Some(position) = world
            .participant(HOST_CONNECTION_ID)
            .map(|participant| participant.position)
        else {
            return;
        };

        // The controller queries its own copy so the world stays free for the route
        let physics = world.physics().clone();
        let move_axis = self.input.move_axis();
        let mut route = Self::route(world);
        self.controller
            .update_fixed(move_axis, position, &physics, &mut route);
    }

    pub fn controller(&self) -> &PlayerController {
        &self.controller
    }

    fn route(world: &mut World) -> Route<'_> {
        let remote: &'static dyn IntentChannel = &NullChannel;
        Route::select(
            &AuthoritySession,
            HOST_CONNECTION_ID,
            Some(world as &mut dyn Authority),
            remote,
        )
    }
}
