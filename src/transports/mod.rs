//! The provided transports.
//!
//! The default transport queues events into a bounded channel drained
//! by a single background thread; see [`HttpTransport`]. For
//! short-lived processes [`BlockingHttpTransport`] sends inline
//! instead.

use std::sync::Arc;

use crate::{ClientOptions, Transport, TransportFactory};

#[cfg(feature = "transport")]
mod ratelimit;
#[cfg(feature = "transport")]
mod thread;
#[cfg(feature = "transport")]
mod ureq;

#[cfg(feature = "transport")]
pub use ratelimit::RateLimiter;
#[cfg(feature = "transport")]
pub use thread::TransportThread;
#[cfg(feature = "transport")]
pub use self::ureq::{BlockingHttpTransport, HttpTransport};

/// The factory the SDK installs when the options carry none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        #[cfg(feature = "transport")]
        {
            Arc::new(HttpTransport::new(options))
        }
        #[cfg(not(feature = "transport"))]
        {
            let _ = options;
            panic!("no default transport configured, enable the `transport` feature");
        }
    }
}
