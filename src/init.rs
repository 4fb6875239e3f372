use std::sync::Arc;

use crate::defaults::apply_defaults;
use crate::{Client, ClientOptions, Hub};

/// Helper struct that is returned from [`init`].
///
/// When this is dropped the client shuts down, draining queued events
/// for up to the configured `shutdown_timeout`. Keep it alive for the
/// lifetime of the program, typically as a binding in `main`.
#[must_use = "when the init guard is dropped the client shuts down"]
pub struct ClientInitGuard(Arc<Client>);

impl std::ops::Deref for ClientInitGuard {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.0
    }
}

impl ClientInitGuard {
    /// Quick check if the client is enabled.
    pub fn is_enabled(&self) -> bool {
        self.0.is_enabled()
    }
}

impl Drop for ClientInitGuard {
    fn drop(&mut self) {
        if self.0.is_enabled() {
            argus_core::argus_debug!("shutting down client");
        }
        self.0.close(None);
    }
}

/// Creates the client, applies the default configuration and binds it
/// to [`Hub::main`].
///
/// This returns a guard that shuts the client down when dropped.
/// Capturing goes through hubs you hold explicitly; derive them from
/// the main hub:
///
/// ```
/// fn main() {
///     let _guard = argus::init(argus::ClientOptions {
///         release: Some(argus::release_name!().into()),
///         ..Default::default()
///     });
///     let hub = std::sync::Arc::new(argus::Hub::new_from_top(argus::Hub::main()));
///     hub.capture_message("hello", argus::protocol::Level::Info);
/// }
/// ```
///
/// Anything convertible into [`ClientOptions`] works as the argument,
/// including a DSN string or a `(dsn, options)` pair.
pub fn init<C: Into<ClientOptions>>(opts: C) -> ClientInitGuard {
    let options = apply_defaults(opts.into());
    let client = Arc::new(Client::with_options(options));
    Hub::main().bind_client(Some(Arc::clone(&client)));
    ClientInitGuard(client)
}
