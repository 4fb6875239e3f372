use std::sync::Arc;
use std::time::Duration;

use crate::protocol::Event;
use crate::ClientOptions;

/// The trait for transports.
///
/// A transport is responsible for shipping events to the monitoring
/// backend. Implementations are expected to queue asynchronously and
/// must never block the caller of [`send_event`](Transport::send_event).
pub trait Transport: Send + Sync + 'static {
    /// Queues an event for delivery.
    ///
    /// This must return quickly; if the transport cannot accept the
    /// event (full queue, shutdown, active rate limit) it drops it.
    fn send_event(&self, event: Event);

    /// Drains the queue, blocking up to `timeout`.
    ///
    /// Returns `true` if the queue was drained in time.
    fn flush(&self, timeout: Duration) -> bool {
        let _ = timeout;
        true
    }

    /// Instructs the transport to stop accepting new events, then
    /// drains what was already queued, blocking up to `timeout`.
    ///
    /// Returns `true` if the queue was drained in time.
    fn shutdown(&self, timeout: Duration) -> bool {
        self.flush(timeout)
    }
}

/// A factory creating transport instances from client options.
///
/// This lets options carry "how to build a transport" without carrying
/// a live transport, which would not survive clones of the options.
pub trait TransportFactory: Send + Sync {
    /// Creates a new transport for the given options.
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&ClientOptions) -> Arc<dyn Transport> + Send + Sync,
{
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        self(options)
    }
}
