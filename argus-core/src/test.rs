//! In-memory capture helpers for testing.
//!
//! This is enabled by the `test` feature and is intended for unit
//! testing code that uses the SDK: events are collected in memory
//! instead of being sent anywhere.
//!
//! ```
//! # use argus_core::protocol::Level;
//! let events = argus_core::test::with_captured_events(|hub| {
//!     hub.capture_message("boom", Level::Error);
//! });
//! assert_eq!(events.len(), 1);
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::protocol::Event;
use crate::{Client, ClientOptions, Hub, Scope, Transport};

/// A transport that collects events in memory.
pub struct TestTransport {
    collected: Mutex<Vec<Event>>,
}

impl TestTransport {
    /// Creates a new test transport.
    pub fn new() -> Arc<TestTransport> {
        Arc::new(TestTransport {
            collected: Mutex::new(vec![]),
        })
    }

    /// Fetches and clears the contained events.
    pub fn fetch_and_clear_events(&self) -> Vec<Event> {
        std::mem::take(
            &mut *self
                .collected
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl Transport for TestTransport {
    fn send_event(&self, event: Event) {
        self.collected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Runs the callback with a fresh hub whose client captures into
/// memory, and returns what was captured.
pub fn with_captured_events<F>(f: F) -> Vec<Event>
where
    F: FnOnce(&Arc<Hub>),
{
    with_captured_events_options(f, ClientOptions::default())
}

/// Like [`with_captured_events`] but with custom client options.
///
/// The DSN and transport in the options are replaced by the in-memory
/// transport.
pub fn with_captured_events_options<F>(f: F, mut options: ClientOptions) -> Vec<Event>
where
    F: FnOnce(&Arc<Hub>),
{
    let transport = TestTransport::new();
    let captured = Arc::clone(&transport);
    options.dsn = Some(
        "https://public@example.com/1"
            .parse()
            .unwrap_or_else(|_| unreachable!()),
    );
    options.transport = Some(Arc::new(move |_: &ClientOptions| {
        Arc::clone(&transport) as Arc<dyn Transport>
    }));

    let client = Arc::new(Client::with_options(options));
    let hub = Arc::new(Hub::new(Some(client), Arc::new(Scope::default())));
    f(&hub);
    if let Some(client) = hub.client() {
        client.close(None);
    }
    captured.fetch_and_clear_events()
}
