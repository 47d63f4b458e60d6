use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use protocol::{Frame, FrameEncoder, FrameMetadataSet};
use session::Session;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::connection::run_connection;
use crate::rate_limiter::ConnectionFilter;
use crate::LoginHandler;

/// Everything a connection task needs, shared by all of them.
pub struct ServerContext {
    /// Frame layout before the session is upgraded.
    pub login_metadata: Arc<FrameMetadataSet>,
    /// Frame layout once the game codec is installed.
    pub game_metadata: Arc<FrameMetadataSet>,
    pub login_handler: Arc<dyn LoginHandler>,
    pub filter: ConnectionFilter,
    pub idle_timeout: Duration,
    /// Written (unciphered) to connections refused by the filter.
    pub rejection_response: Frame,
}

/// Accepts connections until `shutdown` resolves.
pub async fn run_game_server(
    listener: TcpListener,
    context: Arc<ServerContext>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), std::io::Error> {
    tracing::info!(addr = %listener.local_addr()?, "game server listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("game server stopped accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(%peer_addr, error = %e, "failed to set nodelay");
                }

                let permit = match context.filter.try_admit(peer_addr.ip()) {
                    Ok(permit) => permit,
                    Err(rejection) => {
                        tracing::info!(%peer_addr, %rejection, "connection refused");
                        tokio::spawn(refuse(stream, context.rejection_response.clone()));
                        continue;
                    }
                };

                let (session, outbound) = Session::new(peer_addr);
                tracing::info!(session = %session.key(), %peer_addr, "new connection");
                let context = Arc::clone(&context);
                tokio::spawn(run_connection(stream, session, outbound, context, permit));
            }
        }
    }
}

async fn refuse(mut stream: TcpStream, response: Frame) {
    let mut buf = BytesMut::new();
    if FrameEncoder::new().encode(&response, &mut buf).is_ok() {
        let _ = stream.write_all(&buf).await;
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use protocol::{FrameBuilder, FrameCodec, FrameMetadata, IsaacPair};
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::rate_limiter::ConnectionLimits;

    const HELLO: u8 = 14;
    const REPLY: u8 = 1;
    const READY: u8 = 2;
    const GAME_IN: u8 = 40;
    const GAME_OUT: u8 = 41;

    fn login_metadata() -> Arc<FrameMetadataSet> {
        let mut set = FrameMetadataSet::new();
        set.register_inbound(FrameMetadata::fixed(HELLO, 1));
        set.register_outbound(FrameMetadata::fixed(REPLY, 1).headless());
        Arc::new(set)
    }

    fn game_metadata() -> Arc<FrameMetadataSet> {
        let mut set = FrameMetadataSet::new();
        set.register_inbound(FrameMetadata::fixed(GAME_IN, 2));
        set.register_outbound(FrameMetadata::fixed(GAME_OUT, 0));
        Arc::new(set)
    }

    /// Echoes the hello byte back, then upgrades on a second hello.
    #[derive(Default)]
    struct Echo {
        sessions: Mutex<Vec<Session>>,
    }

    impl LoginHandler for Echo {
        fn handle(&self, session: &Session, frame: Frame) {
            let reply = Frame::new(FrameMetadata::fixed(REPLY, 1).headless(), frame.payload().clone()).unwrap();
            if frame.payload()[0] == READY {
                let mut session = session.clone();
                session.write(reply);
                session.upgrade([0, 0, 0, 0]);
                self.sessions.lock().unwrap().push(session);
            } else {
                session.send(reply);
            }
        }
    }

    /// The first frame a client sends once its side of the cipher is running.
    fn ciphered_game_frame(payload: &[u8]) -> BytesMut {
        let mut client = FrameCodec::new(login_metadata());
        client.upgrade(login_metadata(), IsaacPair::mirrored([0, 0, 0, 0]));
        let frame = Frame::new(FrameMetadata::fixed(GAME_IN, 2), payload.to_vec()).unwrap();
        let mut out = BytesMut::new();
        client.encode(&frame, &mut out).unwrap();
        out
    }

    async fn start(limits: ConnectionLimits) -> (std::net::SocketAddr, Arc<Echo>, tokio::sync::oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler = Arc::new(Echo::default());
        let context = Arc::new(ServerContext {
            login_metadata: login_metadata(),
            game_metadata: game_metadata(),
            login_handler: handler.clone(),
            filter: ConnectionFilter::new(limits),
            idle_timeout: Duration::from_secs(5),
            rejection_response: Frame::new(FrameMetadata::fixed(REPLY, 1).headless(), vec![9u8]).unwrap(),
        });
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(run_game_server(listener, context, async {
            let _ = rx.await;
        }));
        (addr, handler, tx)
    }

    #[tokio::test]
    async fn login_frames_reach_handler() {
        let (addr, _handler, _stop) = start(ConnectionLimits::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(&[HELLO, 77]).await.unwrap();
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [77]);
    }

    #[tokio::test]
    async fn upgraded_frames_are_ciphered_and_queued() {
        let (addr, handler, _stop) = start(ConnectionLimits::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(&[HELLO, READY]).await.unwrap();
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await.unwrap();
        stream.write_all(&ciphered_game_frame(&[1, 2])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut session = handler.sessions.lock().unwrap().pop().unwrap();
        let queued = session.inbox().drain();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].opcode(), GAME_IN);
        assert_eq!(&queued[0].payload()[..], &[1, 2]);

        session.write_and_flush(FrameBuilder::new().build(FrameMetadata::fixed(GAME_OUT, 0)).unwrap());
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).await.unwrap();
        let mut server_view = IsaacPair::from_seed([0, 0, 0, 0]);
        assert_eq!(byte[0], GAME_OUT.wrapping_add(server_view.encoding.next_u32() as u8));
    }

    #[tokio::test]
    async fn game_bytes_right_after_the_reply_are_never_read_as_login_frames() {
        let (addr, handler, _stop) = start(ConnectionLimits {
            max_total: 64,
            max_per_address: 64,
        })
        .await;

        let mut streams = Vec::new();
        for i in 0..20u8 {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(&[HELLO, READY]).await.unwrap();
            let mut buf = [0u8; 1];
            stream.read_exact(&mut buf).await.unwrap();
            stream.write_all(&ciphered_game_frame(&[i, i])).await.unwrap();
            streams.push(stream);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let sessions = std::mem::take(&mut *handler.sessions.lock().unwrap());
        assert_eq!(sessions.len(), 20);
        for session in &sessions {
            assert!(!session.is_closed());
            let queued = session.inbox().drain();
            assert_eq!(queued.len(), 1);
            assert_eq!(queued[0].opcode(), GAME_IN);
        }
    }

    #[tokio::test]
    async fn unknown_opcode_closes_connection() {
        let (addr, _handler, _stop) = start(ConnectionLimits::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(&[200]).await.unwrap();

        let mut buf = [0u8; 8];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn refused_connection_gets_rejection_byte() {
        let (addr, _handler, _stop) = start(ConnectionLimits {
            max_total: 10,
            max_per_address: 1,
        })
        .await;
        let _first = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut buf = Vec::new();
        second.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, vec![9]);
    }
}
