use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use argus_types::{random_uuid, Dsn, Uuid};

use crate::constants::sdk_info;
use crate::hub::{read_lock, write_lock};
use crate::marshal::get_request_body_from_event;
use crate::performance::rate_sample;
use crate::protocol::Event;
use crate::{ClientOptions, EventProcessor, Scope, Transport};

/// The mutable state a client shares with its transport users.
///
/// Both the transport handle and the processor list live behind the
/// same lock, so a concurrent `close` can never observe a half-updated
/// client and an in-flight capture uses a consistent snapshot of both.
struct ClientShared {
    transport: Option<Arc<dyn Transport>>,
    event_processors: Vec<Arc<dyn EventProcessor>>,
}

/// The client, which prepares events and hands them to its transport.
///
/// Clients are shared across hubs behind an [`Arc`] and all methods
/// take `&self`; a client is immutable configuration plus one lock of
/// shared state.
pub struct Client {
    options: ClientOptions,
    shared: RwLock<ClientShared>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("dsn", &self.dsn())
            .field("options", &self.options)
            .finish()
    }
}

impl From<ClientOptions> for Client {
    fn from(options: ClientOptions) -> Client {
        Client::with_options(options)
    }
}

impl Client {
    /// Creates a new client from the given options.
    ///
    /// If the options contain a DSN and a transport factory, the
    /// transport is started here. Without a DSN the client is created
    /// disabled and every capture is a no-op.
    pub fn with_options(options: ClientOptions) -> Client {
        crate::set_debug_enabled(options.debug);

        let transport = if options.dsn.is_some() {
            options
                .transport
                .as_ref()
                .map(|factory| factory.create_transport(&options))
        } else {
            None
        };
        if transport.is_none() {
            crate::argus_debug!("client created without transport, captures are discarded");
        }

        let event_processors = options.event_processors.clone();
        Client {
            options,
            shared: RwLock::new(ClientShared {
                transport,
                event_processors,
            }),
        }
    }

    /// Returns the options of this client.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the DSN that constructed this client.
    pub fn dsn(&self) -> Option<&Dsn> {
        self.options.dsn.as_ref()
    }

    /// Quick check to see if the client is enabled.
    pub fn is_enabled(&self) -> bool {
        read_lock(&self.shared).transport.is_some()
    }

    /// Registers an event processor that runs on every captured event,
    /// after the scope's processors.
    pub fn add_event_processor(&self, processor: Arc<dyn EventProcessor>) {
        write_lock(&self.shared).event_processors.push(processor);
    }

    /// Captures an event and sends it to the transport.
    ///
    /// Returns the id of the event if it was queued, or `None` if it
    /// was discarded along the way (no transport, dropped by a
    /// processor or `before_send`, sampled out, or unserializable).
    pub fn capture_event(&self, event: Event, scope: Option<&Scope>) -> Option<Uuid> {
        let (transport, processors) = {
            let shared = read_lock(&self.shared);
            match shared.transport.as_ref() {
                Some(transport) => (
                    Arc::clone(transport),
                    shared.event_processors.clone(),
                ),
                None => return None,
            }
        };

        let event = self.prepare_event(event, scope, &processors)?;
        let event_id = event.event_id;

        // events that cannot be serialized even after stripping would
        // poison the transport, reject them here
        get_request_body_from_event(&event)?;

        transport.send_event(event);
        Some(event_id)
    }

    fn prepare_event(
        &self,
        mut event: Event,
        scope: Option<&Scope>,
        processors: &[Arc<dyn EventProcessor>],
    ) -> Option<Event> {
        if event.event_id.is_nil() {
            event.event_id = random_uuid();
        }

        if let Some(scope) = scope {
            event = scope.apply_to_event(event)?;
        }

        for processor in processors {
            event = processor.process_event(event)?;
        }

        if event.sdk.is_none() {
            event.sdk = Some(sdk_info());
        }
        if event.release.is_none() {
            event.release = self.options.release.as_deref().map(str::to_owned);
        }
        if event.environment.is_none() {
            event.environment = self.options.environment.as_deref().map(str::to_owned);
        }
        if event.server_name.is_none() {
            event.server_name = self.options.server_name.as_deref().map(str::to_owned);
        }

        // transactions are sampled at start and bypass `before_send`
        if event.ty.is_none() {
            if let Some(before_send) = self.options.before_send.as_ref() {
                let id = event.event_id;
                event = match before_send(event) {
                    Some(event) => event,
                    None => {
                        crate::argus_debug!("before_send dropped event {}", id);
                        return None;
                    }
                };
            }

            if !rate_sample(self.options.sample_rate) {
                crate::argus_debug!("event dropped by sample rate");
                return None;
            }
        }

        Some(event)
    }

    /// Drains the transport queue, blocking up to `timeout` (or the
    /// configured `shutdown_timeout`).
    ///
    /// Returns `true` if the queue was drained in time.
    pub fn flush(&self, timeout: Option<Duration>) -> bool {
        let transport = read_lock(&self.shared).transport.clone();
        match transport {
            Some(transport) => transport.flush(timeout.unwrap_or(self.options.shutdown_timeout)),
            None => true,
        }
    }

    /// Shuts the client down, draining what is queued and discarding
    /// everything captured afterwards.
    ///
    /// Returns `true` if the queue was drained in time.
    pub fn close(&self, timeout: Option<Duration>) -> bool {
        let transport = write_lock(&self.shared).transport.take();
        match transport {
            Some(transport) => {
                transport.shutdown(timeout.unwrap_or(self.options.shutdown_timeout))
            }
            None => true,
        }
    }
}
