//! TCP transport: accepts connections, owns each socket's codec state and
//! moves frames between the wire and [`session::Session`] handles.

pub mod connection;
pub mod rate_limiter;
pub mod server;

use protocol::Frame;
use session::Session;

pub use rate_limiter::{ConnectionFilter, ConnectionLimits, ConnectionPermit, ConnectionRejection};
pub use server::{run_game_server, ServerContext};

/// Receives every frame a connection decodes before it is upgraded to the game codec.
///
/// Implementations must not block: they run on the connection's task.
pub trait LoginHandler: Send + Sync + 'static {
    fn handle(&self, session: &Session, frame: Frame);
}
