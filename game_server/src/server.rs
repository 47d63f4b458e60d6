use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use engine_core::ServiceScheduler;
use login::{AuthenticationService, Authenticator, FailedLoginLimiter, LoginFrameHandler, SqlCredentialStore};
use net::{ConnectionFilter, ConnectionLimits, ServerContext};
use player_db::{PlayerDb, PlayerDbError};
use protocol::ProtocolError;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use world::message::encode::login_status;
use world::message::game_metadata;
use world::{
    GameService, ParallelUpdater, Registrations, ResponseCode, SequentialUpdater, Updater, World, MAXIMUM_PLAYERS,
};

use crate::config::{ConfigError, ServerConfig};
use crate::shutdown::ShutdownRx;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("account database: {0}")]
    Database(#[from] PlayerDbError),
    #[error("update pool: {0}")]
    UpdatePool(#[from] rayon::ThreadPoolBuildError),
    #[error("frame encoding: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("scheduler thread panicked")]
    SchedulerPanicked,
}

/// A bound listener plus the services that run the world behind it.
pub struct GameServer {
    listener: TcpListener,
    context: Arc<ServerContext>,
    scheduler: ServiceScheduler,
}

impl GameServer {
    /// Opens the account database, builds the world and binds the listener.
    ///
    /// Must be called inside a Tokio runtime; authentication work is spawned onto it.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let spawn = config.spawn()?;
        let bind_addr = config.bind_addr()?;
        let db = PlayerDb::open(&config.login.database_path)?;

        let registrations = Registrations::new(MAXIMUM_PLAYERS);
        let world = World::new(registrations.clone(), updater(config)?);

        let authenticator = Arc::new(Authenticator::new(
            Arc::new(SqlCredentialStore::new(db, config.login.register_unknown_accounts)),
            FailedLoginLimiter::default(),
            registrations,
            spawn,
        ));
        let (authentication, queue) = AuthenticationService::new(authenticator, Handle::current());

        let mut scheduler = ServiceScheduler::new(config.to_scheduler_config());
        scheduler.register(authentication);
        scheduler.register(GameService::new(world));

        let context = Arc::new(ServerContext {
            login_metadata: login::login_metadata(),
            game_metadata: game_metadata(),
            login_handler: Arc::new(LoginFrameHandler::new(queue, config.login.client_version)),
            filter: ConnectionFilter::new(ConnectionLimits {
                max_total: MAXIMUM_PLAYERS,
                max_per_address: config.net.max_connections_per_ip,
            }),
            idle_timeout: config.idle_timeout(),
            rejection_response: login_status(ResponseCode::TooManyConnections)?,
        });

        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self {
            listener,
            context,
            scheduler,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections and pulses the scheduler until `shutdown` fires.
    pub async fn run(self, shutdown: ShutdownRx) -> Result<(), ServerError> {
        let Self {
            listener,
            context,
            mut scheduler,
        } = self;

        let halted = Arc::new(AtomicBool::new(false));
        let scheduler_thread = {
            let shutdown = shutdown.clone();
            let halted = Arc::clone(&halted);
            std::thread::Builder::new()
                .name("scheduler".to_string())
                .spawn(move || {
                    let pulses = scheduler.run(|| shutdown.is_shutdown() || halted.load(Ordering::Acquire));
                    tracing::info!(pulses, "scheduler stopped");
                })?
        };

        let served = net::run_game_server(listener, context, shutdown.wait()).await;
        halted.store(true, Ordering::Release);

        let joined = tokio::task::spawn_blocking(move || scheduler_thread.join()).await;
        served?;
        match joined {
            Ok(Ok(())) => Ok(()),
            _ => Err(ServerError::SchedulerPanicked),
        }
    }
}

fn updater(config: &ServerConfig) -> Result<Box<dyn Updater>, ServerError> {
    let world = &config.world;
    if !world.parallel_updates {
        return Ok(Box::new(SequentialUpdater));
    }
    let updater = match world.update_threads {
        0 => ParallelUpdater::with_available_parallelism()?,
        threads => ParallelUpdater::new(threads)?,
    };
    Ok(Box::new(updater))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_updates_need_no_pool() {
        let mut config = ServerConfig::default();
        config.world.parallel_updates = false;
        assert!(updater(&config).is_ok());
        config.world.parallel_updates = true;
        config.world.update_threads = 2;
        assert!(updater(&config).is_ok());
    }

    #[tokio::test]
    async fn bad_spawn_fails_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.login.database_path = dir.path().join("accounts.db").display().to_string();
        config.world.spawn_height = 9;
        assert!(matches!(
            GameServer::bind(&config).await,
            Err(ServerError::Config(ConfigError::SpawnHeight(9)))
        ));
    }
}
