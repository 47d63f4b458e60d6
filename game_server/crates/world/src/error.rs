use protocol::ProtocolError;
use space::Direction;

/// Failure of one player's unit of work in the update pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("no descriptor matches directions {first:?}/{second:?}")]
    Unclassifiable { first: Direction, second: Direction },

    #[error("failed to build update frame: {0}")]
    Frame(#[from] ProtocolError),
}
