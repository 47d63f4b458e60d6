pub mod events;
pub mod scheduler;
pub mod service;

pub use events::{EventChain, Flow};
pub use scheduler::{SchedulerConfig, ServiceScheduler};
pub use service::{Service, ServiceError};
