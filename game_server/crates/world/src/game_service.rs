use std::time::Duration;

use engine_core::{Service, ServiceError};

use crate::world::World;

/// Players registered per pulse.
pub const REGISTRATIONS_PER_PULSE: usize = 50;

/// Drives the world once every game tick.
pub struct GameService {
    world: World,
}

impl GameService {
    pub const INTERVAL: Duration = Duration::from_millis(600);

    pub fn new(world: World) -> Self {
        Self { world }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Service for GameService {
    fn name(&self) -> &'static str {
        "game"
    }

    fn interval(&self) -> Duration {
        Self::INTERVAL
    }

    fn execute(&mut self) -> Result<(), ServiceError> {
        let registered = self.world.register_pending(REGISTRATIONS_PER_PULSE);
        let closed = self.world.sweep_closed();
        if registered > 0 || closed > 0 {
            tracing::debug!(registered, closed, online = self.world.players().size(), "player list changed");
        }
        self.world.dispatch_inboxes();
        self.world.pulse();
        Ok(())
    }
}
