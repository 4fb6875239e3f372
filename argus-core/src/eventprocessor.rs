use crate::protocol::Event;

/// A hook that can inspect, modify or discard every event a client
/// captures.
///
/// Processors registered on a [`Scope`] run first, followed by the
/// processors registered on the [`Client`] itself. Returning `None`
/// discards the event.
///
/// [`Scope`]: crate::Scope
/// [`Client`]: crate::Client
pub trait EventProcessor: Send + Sync {
    /// Process the given event, returning `None` to drop it.
    fn process_event(&self, event: Event) -> Option<Event>;
}

impl<F> EventProcessor for F
where
    F: Fn(Event) -> Option<Event> + Send + Sync,
{
    fn process_event(&self, event: Event) -> Option<Event> {
        self(event)
    }
}
