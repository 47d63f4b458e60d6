use std::sync::Arc;
use std::time::Instant;

use session::Session;
use space::Position;
use world::{Credentials, Player, Registrations};

use crate::error::LoginError;
use crate::limiter::FailedLoginLimiter;
use crate::store::CredentialStore;

pub const MAXIMUM_USERNAME_LENGTH: usize = 12;
pub const MAXIMUM_PASSWORD_LENGTH: usize = 20;

/// What a validated login frame carries into authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
    pub session_seed: [u32; 4],
    pub uid: u32,
}

#[derive(Debug)]
pub struct AuthenticationRequest {
    pub session: Session,
    pub credentials: LoginCredentials,
}

/// The blocking half of a login: credential checks and admission to the world.
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    limiter: FailedLoginLimiter,
    registrations: Registrations,
    spawn: Position,
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        limiter: FailedLoginLimiter,
        registrations: Registrations,
        spawn: Position,
    ) -> Self {
        Self {
            store,
            limiter,
            registrations,
            spawn,
        }
    }

    /// Authenticates `request`, refusing the session with a status byte on failure.
    pub fn process(&self, request: AuthenticationRequest) {
        let session = request.session.clone();
        let username = request.credentials.username.clone();
        match self.authenticate(request, Instant::now()) {
            Ok(()) => tracing::debug!(session = %session.key(), %username, "player queued for registration"),
            Err(e) => {
                tracing::info!(session = %session.key(), %username, reason = %e, "login refused");
                crate::refuse(&session, e.response_code());
            }
        }
    }

    /// Checks the request and queues the new player for registration.
    pub fn authenticate(&self, request: AuthenticationRequest, now: Instant) -> Result<(), LoginError> {
        let AuthenticationRequest { session, credentials } = request;
        let LoginCredentials {
            username,
            password,
            session_seed,
            uid,
        } = credentials;

        let username_length = username.chars().count();
        let password_length = password.chars().count();
        if !(1..=MAXIMUM_USERNAME_LENGTH).contains(&username_length)
            || !(1..=MAXIMUM_PASSWORD_LENGTH).contains(&password_length)
        {
            return Err(LoginError::InvalidCredentials);
        }
        let identity = Credentials::new(username, session_seed, uid).map_err(|_| LoginError::InvalidCredentials)?;

        let address = session.remote_addr().ip();
        let Some(attempt) = self.limiter.try_begin(address, now) else {
            return Err(LoginError::TooManyLogins);
        };

        let account = match self.store.verify(identity.username(), &password) {
            Err(LoginError::InvalidCredentials) => {
                attempt.failed(now);
                return Err(LoginError::InvalidCredentials);
            }
            result => result?,
        };
        drop(attempt);

        let player = Player::new(identity, account.privilege, account.member, session, self.spawn);
        self.registrations
            .admit(player)
            .map_err(|(reason, _)| LoginError::Admission(reason))
    }
}
