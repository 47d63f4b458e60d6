use protocol::{Decoded, Frame};
use session::Session;
use world::ResponseCode;

use crate::authenticator::{AuthenticationRequest, LoginCredentials};
use crate::message::{self, LoginBlock, LoginMessage};
use crate::service::AuthenticationQueue;

const EXPECTED_MAGIC: u8 = 255;
const EXPECTED_BLOCK_OPCODE: u8 = 10;

/// Checks the fixed fields of a login block against the connection it arrived on.
pub fn validate(block: LoginBlock, client_version: u16, session: &Session) -> Result<LoginCredentials, ResponseCode> {
    if block.magic != EXPECTED_MAGIC {
        return Err(ResponseCode::LoginServerRejectedSession);
    }
    if block.client_version != client_version {
        return Err(ResponseCode::GameUpdated);
    }
    if block.detail > 1 {
        return Err(ResponseCode::LoginServerRejectedSession);
    }
    if block.block_opcode != EXPECTED_BLOCK_OPCODE {
        return Err(ResponseCode::LoginServerRejectedSession);
    }
    if block.server_key() != session.key().0 {
        return Err(ResponseCode::BadSessionId);
    }
    Ok(LoginCredentials {
        username: block.username,
        password: block.password,
        session_seed: block.session_keys,
        uid: block.uid,
    })
}

/// Answers handshakes and forwards valid login frames to the authentication queue.
pub struct LoginFrameHandler {
    queue: AuthenticationQueue,
    client_version: u16,
}

impl LoginFrameHandler {
    pub fn new(queue: AuthenticationQueue, client_version: u16) -> Self {
        Self { queue, client_version }
    }
}

impl net::LoginHandler for LoginFrameHandler {
    fn handle(&self, session: &Session, frame: Frame) {
        match message::login_registry().decode(&frame) {
            Ok(Decoded::Message(LoginMessage::Handshake { name_hash })) => {
                tracing::trace!(session = %session.key(), name_hash, "login handshake");
                match message::handshake_response(session.key()) {
                    Ok(response) => session.send(response),
                    Err(e) => {
                        tracing::error!(session = %session.key(), error = %e, "failed to build handshake response");
                        session.close();
                    }
                }
            }
            Ok(Decoded::Message(LoginMessage::Login(block))) => {
                let reconnecting = block.reconnecting;
                match validate(block, self.client_version, session) {
                    Ok(credentials) => {
                        tracing::debug!(session = %session.key(), username = %credentials.username, reconnecting, "login received");
                        let request = AuthenticationRequest {
                            session: session.clone(),
                            credentials,
                        };
                        if self.queue.submit(request).is_err() {
                            crate::refuse(session, ResponseCode::LoginServerOffline);
                        }
                    }
                    Err(code) => {
                        tracing::info!(session = %session.key(), %code, "login block rejected");
                        crate::refuse(session, code);
                    }
                }
            }
            Ok(Decoded::Unhandled(opcode)) => tracing::debug!(session = %session.key(), opcode, "ignored login frame"),
            Err(e) => {
                tracing::warn!(session = %session.key(), error = %e, "malformed login frame");
                session.close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use net::LoginHandler;
    use session::{Outbound, SessionKey};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::message::tests::block;
    use crate::message::{encode_login, HANDSHAKE};
    use crate::service::tests::queue;

    fn session() -> (Session, UnboundedReceiver<Outbound>) {
        Session::new("127.0.0.1:50001".parse().unwrap())
    }

    fn status(rx: &mut UnboundedReceiver<Outbound>) -> u8 {
        match rx.try_recv() {
            Ok(Outbound::Frames(frames)) => frames[0].payload()[0],
            other => panic!("expected a status frame, got {other:?}"),
        }
    }

    #[test]
    fn validation_order() {
        let (session, _rx) = session();
        let key = session.key();
        let valid = || block(key, "alice", "secret");

        let mut b = valid();
        b.magic = 1;
        b.client_version = 1;
        assert_eq!(validate(b, 317, &session), Err(ResponseCode::LoginServerRejectedSession));

        let mut b = valid();
        b.client_version = 1;
        b.detail = 7;
        assert_eq!(validate(b, 317, &session), Err(ResponseCode::GameUpdated));

        let mut b = valid();
        b.detail = 2;
        assert_eq!(validate(b, 317, &session), Err(ResponseCode::LoginServerRejectedSession));

        let mut b = valid();
        b.block_opcode = 11;
        b.session_keys = [0; 4];
        assert_eq!(validate(b, 317, &session), Err(ResponseCode::LoginServerRejectedSession));

        assert_eq!(
            validate(block(SessionKey(key.0 ^ 1), "alice", "secret"), 317, &session),
            Err(ResponseCode::BadSessionId)
        );

        let credentials = validate(valid(), 317, &session).unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.session_seed[2..], [(key.0 >> 32) as u32, key.0 as u32]);
    }

    #[test]
    fn handshake_is_answered_with_the_session_key() {
        let (queue, _requests) = queue();
        let handler = LoginFrameHandler::new(queue, 317);
        let (session, mut rx) = session();

        handler.handle(&session, Frame::new(HANDSHAKE, vec![3u8]).unwrap());
        match rx.try_recv() {
            Ok(Outbound::Frames(frames)) => {
                let payload = &frames[0].payload()[..];
                assert_eq!(payload.len(), 17);
                assert_eq!(&payload[9..], &session.key().0.to_be_bytes());
            }
            other => panic!("expected handshake response, got {other:?}"),
        }
        assert!(!session.is_closed());
    }

    #[test]
    fn outdated_client_is_refused() {
        let (queue, mut requests) = queue();
        let handler = LoginFrameHandler::new(queue, 317);
        let (session, mut rx) = session();

        let mut login = block(session.key(), "alice", "secret");
        login.client_version = 289;
        handler.handle(&session, encode_login(&login).unwrap());
        assert_eq!(status(&mut rx), ResponseCode::GameUpdated.value());
        assert!(session.is_closed());
        assert!(requests.try_recv().is_err());
    }

    #[test]
    fn valid_login_is_queued() {
        let (queue, mut requests) = queue();
        let handler = LoginFrameHandler::new(queue, 317);
        let (session, _rx) = session();

        handler.handle(&session, encode_login(&block(session.key(), "alice", "secret")).unwrap());
        assert!(!session.is_closed());
        let request = requests.try_recv().unwrap();
        assert_eq!(request.session.key(), session.key());
        assert_eq!(request.credentials.password, "secret");
    }

    #[test]
    fn login_is_refused_once_the_service_is_gone() {
        let (queue, requests) = queue();
        drop(requests);
        let handler = LoginFrameHandler::new(queue, 317);
        let (session, mut rx) = session();

        handler.handle(&session, encode_login(&block(session.key(), "alice", "secret")).unwrap());
        assert_eq!(status(&mut rx), ResponseCode::LoginServerOffline.value());
    }

    #[test]
    fn malformed_login_closes_without_response() {
        let (queue, _requests) = queue();
        let handler = LoginFrameHandler::new(queue, 317);
        let (session, mut rx) = session();

        handler.handle(&session, Frame::new(message::NEW_LOGIN, vec![255u8, 1]).unwrap());
        assert!(session.is_closed());
        assert!(matches!(rx.try_recv(), Ok(Outbound::Close)));
    }
}
