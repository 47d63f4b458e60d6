use std::sync::Arc;
use std::time::Duration;

use engine_core::{Service, ServiceError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::authenticator::{AuthenticationRequest, Authenticator};

pub const REQUESTS_PER_PULSE: usize = 50;

/// Producer side of the authentication queue. Cloning shares the queue.
#[derive(Debug, Clone)]
pub struct AuthenticationQueue {
    requests: mpsc::UnboundedSender<AuthenticationRequest>,
}

impl AuthenticationQueue {
    /// Enqueues `request` without blocking. Fails only once the service is gone.
    pub fn submit(&self, request: AuthenticationRequest) -> Result<(), AuthenticationRequest> {
        self.requests.send(request).map_err(|e| e.0)
    }
}

/// Moves queued login requests onto the blocking pool.
///
/// Each pulse hands at most [`REQUESTS_PER_PULSE`] requests to
/// [`Authenticator::process`] on the runtime's blocking threads, so credential
/// checks never run on the scheduler thread.
pub struct AuthenticationService {
    requests: mpsc::UnboundedReceiver<AuthenticationRequest>,
    authenticator: Arc<Authenticator>,
    runtime: Handle,
}

impl AuthenticationService {
    pub const INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(authenticator: Arc<Authenticator>, runtime: Handle) -> (Self, AuthenticationQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            requests: rx,
            authenticator,
            runtime,
        };
        (service, AuthenticationQueue { requests: tx })
    }
}

impl Service for AuthenticationService {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn interval(&self) -> Duration {
        Self::INTERVAL
    }

    fn execute(&mut self) -> Result<(), ServiceError> {
        for _ in 0..REQUESTS_PER_PULSE {
            let Ok(request) = self.requests.try_recv() else {
                break;
            };
            let authenticator = Arc::clone(&self.authenticator);
            self.runtime.spawn_blocking(move || authenticator.process(request));
        }
        Ok(())
    }
}
