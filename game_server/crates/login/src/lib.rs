//! Login: the handshake, login frame validation and the authentication pipeline.

pub mod authenticator;
pub mod error;
pub mod handler;
pub mod limiter;
pub mod message;
pub mod service;
pub mod store;

use session::Session;
use world::message::encode;
use world::ResponseCode;

pub use authenticator::{AuthenticationRequest, Authenticator, LoginCredentials};
pub use error::LoginError;
pub use handler::LoginFrameHandler;
pub use limiter::{FailedLoginLimiter, LoginAttempt};
pub use message::{login_metadata, login_registry};
pub use service::{AuthenticationQueue, AuthenticationService};
pub use store::{AccountDetails, CredentialStore, SqlCredentialStore};

/// Sends a single status byte and closes the session.
pub fn refuse(session: &Session, code: ResponseCode) {
    match encode::login_status(code) {
        Ok(frame) => session.send_and_close(frame),
        Err(e) => {
            tracing::error!(session = %session.key(), error = %e, "failed to build login status");
            session.close();
        }
    }
}
