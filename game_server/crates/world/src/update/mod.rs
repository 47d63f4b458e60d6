//! The per-tick player update pipeline.

pub mod block;
pub mod descriptor;
pub mod encoder;
pub mod snapshot;
pub mod task;
pub mod updater;

pub use block::{AppearanceBlock, BlockSet, ChatBlock};
pub use descriptor::{DescriptorKind, PlayerDescriptor};
pub use snapshot::UpdateSnapshot;
pub use task::{MAXIMUM_ADDITIONS_PER_PULSE, MAXIMUM_LOCAL_PLAYERS};
pub use updater::{ParallelUpdater, SequentialUpdater, Updater};
