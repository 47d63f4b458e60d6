//! Drives a login frame through validation, the SQLite credential store and
//! admission, until the world registers the player.

use std::sync::Arc;
use std::time::Duration;

use engine_core::Service;
use login::message::{encode_login, LoginBlock, ARCHIVE_COUNT};
use login::{AuthenticationService, Authenticator, FailedLoginLimiter, LoginFrameHandler, SqlCredentialStore};
use net::LoginHandler;
use player_db::PlayerDb;
use session::{Outbound, Session};
use space::Position;
use tokio::runtime::Handle;
use world::{Registrations, World, MAXIMUM_PLAYERS};

fn login_frame(session: &Session, username: &str, password: &str) -> protocol::Frame {
    let key = session.key().0;
    encode_login(&LoginBlock {
        reconnecting: false,
        magic: 255,
        client_version: 317,
        detail: 1,
        archive_checksums: [0; ARCHIVE_COUNT],
        block_opcode: 10,
        session_keys: [5, 6, (key >> 32) as u32, key as u32],
        uid: 0,
        username: username.to_owned(),
        password: password.to_owned(),
    })
    .unwrap()
}

async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(flavor = "multi_thread")]
async fn registered_account_logs_into_the_world() {
    let dir = tempfile::tempdir().unwrap();
    let db = PlayerDb::open(dir.path().join("accounts.db")).unwrap();
    db.account().create("alice", "secret").unwrap();

    let registrations = Registrations::new(MAXIMUM_PLAYERS);
    let authenticator = Arc::new(Authenticator::new(
        Arc::new(SqlCredentialStore::new(db, false)),
        FailedLoginLimiter::default(),
        registrations.clone(),
        Position::ground(3222, 3218),
    ));
    let (mut service, queue) = AuthenticationService::new(authenticator, Handle::current());
    let handler = LoginFrameHandler::new(queue, 317);
    let mut world = World::sequential(registrations.clone());

    let (good, mut good_rx) = Session::new("127.0.0.1:50010".parse().unwrap());
    let (bad, mut bad_rx) = Session::new("127.0.0.1:50011".parse().unwrap());
    handler.handle(&good, login_frame(&good, "alice", "secret"));
    handler.handle(&bad, login_frame(&bad, "bob", "secret"));

    service.execute().unwrap();
    eventually(|| registrations.queued_len() == 1 && bad.is_closed()).await;

    match bad_rx.try_recv() {
        Ok(Outbound::Frames(frames)) => assert_eq!(&frames[0].payload()[..], &[3]),
        other => panic!("expected invalid credentials, got {other:?}"),
    }

    assert_eq!(world.register_pending(50), 1);
    match good_rx.try_recv() {
        Ok(Outbound::Upgrade { reply, seed }) => {
            assert_eq!(&reply[0].payload()[..], &[2, 0, 0]);
            assert_eq!(&seed[..2], &[5, 6]);
        }
        other => panic!("expected login response with the upgrade, got {other:?}"),
    }
    assert!(!good.is_closed());
}
