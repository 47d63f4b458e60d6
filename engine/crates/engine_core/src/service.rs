use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service {service} panicked: {message}")]
    Panicked {
        service: &'static str,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ServiceError {
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}

/// A periodic unit of work driven by the [`ServiceScheduler`](crate::ServiceScheduler).
pub trait Service: Send {
    fn name(&self) -> &'static str;

    /// How often [`Service::execute`] should run.
    fn interval(&self) -> Duration;

    fn execute(&mut self) -> Result<(), ServiceError>;
}
