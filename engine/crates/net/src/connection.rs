use std::sync::Arc;

use bytes::BytesMut;
use protocol::{Frame, FrameCodec, IsaacPair};
use session::{Outbound, Session};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::rate_limiter::ConnectionPermit;
use crate::server::ServerContext;

const READ_BUFFER_CAPACITY: usize = 4096;

/// Why a connection task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    ClientClosed,
    SessionClosed,
    IdleTimeout,
    ProtocolViolation,
    Io,
}

/// Drives one socket until either side closes it.
///
/// Inbound bytes are decoded with the connection's codec. Until the session
/// is upgraded every frame goes to the login handler; afterwards frames are
/// queued in the session inbox for the game service. Outbound instructions
/// are applied in the order the session issued them, and ahead of any
/// pending read.
pub async fn run_connection(
    stream: TcpStream,
    session: Session,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    context: Arc<ServerContext>,
    permit: ConnectionPermit,
) -> Disconnect {
    let (mut reader, mut writer) = stream.into_split();
    let mut codec = FrameCodec::new(Arc::clone(&context.login_metadata));
    let mut upgraded = false;
    let mut read_buf = BytesMut::with_capacity(READ_BUFFER_CAPACITY);
    let mut write_buf = BytesMut::new();

    let reason = 'connection: loop {
        tokio::select! {
            biased;

            instruction = outbound.recv() => {
                match instruction {
                    Some(Outbound::Frames(frames)) => {
                        if let Err(reason) = write_frames(&mut writer, &mut codec, &frames, &mut write_buf, &session).await {
                            break reason;
                        }
                    }
                    Some(Outbound::Upgrade { reply, seed }) => {
                        if let Err(reason) = write_frames(&mut writer, &mut codec, &reply, &mut write_buf, &session).await {
                            break reason;
                        }
                        codec.upgrade(Arc::clone(&context.game_metadata), IsaacPair::from_seed(seed));
                        upgraded = true;
                        tracing::debug!(session = %session.key(), "codec upgraded");
                    }
                    Some(Outbound::Close) | None => break Disconnect::SessionClosed,
                }
            }
            read = tokio::time::timeout(context.idle_timeout, reader.read_buf(&mut read_buf)) => {
                match read {
                    Err(_) => break Disconnect::IdleTimeout,
                    Ok(Err(e)) => {
                        tracing::debug!(session = %session.key(), error = %e, "read failed");
                        break Disconnect::Io;
                    }
                    Ok(Ok(0)) => break Disconnect::ClientClosed,
                    Ok(Ok(_)) => {}
                }

                loop {
                    match codec.decode(&mut read_buf) {
                        Ok(Some(frame)) if upgraded => {
                            if !session.inbox().push(frame) {
                                tracing::warn!(session = %session.key(), "inbox full, dropping frame");
                            }
                        }
                        Ok(Some(frame)) => context.login_handler.handle(&session, frame),
                        Ok(None) => break,
                        Err(e) => {
                            tracing::warn!(session = %session.key(), remote = %session.remote_addr(), error = %e, "protocol violation");
                            break 'connection Disconnect::ProtocolViolation;
                        }
                    }
                }
            }
        }
    };

    session.close();
    let _ = writer.shutdown().await;
    tracing::info!(session = %session.key(), remote = %permit.address(), reason = ?reason, "connection ended");
    drop(permit);
    reason
}

/// Encodes `frames` with the current codec and writes them in one batch.
async fn write_frames(
    writer: &mut OwnedWriteHalf,
    codec: &mut FrameCodec,
    frames: &[Frame],
    write_buf: &mut BytesMut,
    session: &Session,
) -> Result<(), Disconnect> {
    if frames.is_empty() {
        return Ok(());
    }
    for frame in frames {
        if let Err(e) = codec.encode(frame, write_buf) {
            tracing::error!(session = %session.key(), error = %e, "failed to encode frame");
            return Err(Disconnect::ProtocolViolation);
        }
    }
    let written = writer.write_all(&write_buf[..]).await;
    write_buf.clear();
    written.map_err(|e| {
        tracing::debug!(session = %session.key(), error = %e, "write failed");
        Disconnect::Io
    })
}
