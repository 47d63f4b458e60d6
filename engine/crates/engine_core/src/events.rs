/// Whether an event keeps travelling down an [`EventChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub type EventConsumer<C, E> = Box<dyn Fn(&mut C, &E) -> Flow + Send + Sync>;

/// Ordered list of consumers notified of an event against a mutable context.
///
/// Consumers run in registration order until one returns [`Flow::Stop`].
pub struct EventChain<C, E> {
    consumers: Vec<EventConsumer<C, E>>,
}

impl<C, E> EventChain<C, E> {
    pub fn new() -> Self {
        Self {
            consumers: Vec::new(),
        }
    }

    pub fn add(&mut self, consumer: impl Fn(&mut C, &E) -> Flow + Send + Sync + 'static) {
        self.consumers.push(Box::new(consumer));
    }

    /// Notifies the consumers in order. Returns true if one of them stopped the chain.
    pub fn notify(&self, context: &mut C, event: &E) -> bool {
        self.consumers
            .iter()
            .any(|consumer| consumer(context, event) == Flow::Stop)
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

impl<C, E> Default for EventChain<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> std::fmt::Debug for EventChain<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChain")
            .field("consumers", &self.consumers.len())
            .finish()
    }
}
