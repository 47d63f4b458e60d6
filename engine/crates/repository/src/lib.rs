mod id;
mod repository;

pub use id::MobId;
pub use repository::{Cursor, CursorError, Indexed, MobRepository};
