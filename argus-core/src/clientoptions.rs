use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::USER_AGENT;
use crate::performance::TransactionContext;
use crate::protocol::{Breadcrumb, Event};
use crate::{EventProcessor, IntoDsn, TransportFactory};
use argus_types::Dsn;

/// A callback deciding whether a transaction should be sampled.
pub type TracesSampler = dyn Fn(&TransactionContext) -> bool + Send + Sync;

/// A callback run on every event right before it is queued.
pub type BeforeCallback = dyn Fn(Event) -> Option<Event> + Send + Sync;

/// A callback run on every breadcrumb before it is recorded.
pub type BeforeBreadcrumbCallback = dyn Fn(Breadcrumb) -> Option<Breadcrumb> + Send + Sync;

/// Configuration settings for the client.
///
/// These options are set when the SDK is first initialized and remain
/// fixed for the lifetime of the client they configure.
///
/// # Examples
///
/// ```
/// let options = argus_core::ClientOptions {
///     debug: true,
///     ..Default::default()
/// };
/// assert!(options.debug);
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// The DSN to use. If not set the client is effectively disabled.
    pub dsn: Option<Dsn>,
    /// Enables diagnostic mode: internal SDK messages are additionally
    /// printed to stderr.
    pub debug: bool,
    /// The release to be sent with events.
    pub release: Option<Cow<'static, str>>,
    /// The environment to be sent with events.
    pub environment: Option<Cow<'static, str>>,
    /// The server name to be reported.
    pub server_name: Option<Cow<'static, str>>,
    /// The sample rate for error events (between 0.0 and 1.0, defaults
    /// to all events being sent).
    pub sample_rate: f32,
    /// The sample rate for transactions (between 0.0 and 1.0, defaults
    /// to no transactions being sent).
    pub traces_sample_rate: f32,
    /// A custom callback deciding whether to sample a transaction.
    ///
    /// When set this takes precedence over an inherited parent decision
    /// and over `traces_sample_rate`; only an explicit decision on the
    /// transaction context itself overrides it.
    pub traces_sampler: Option<Arc<TracesSampler>>,
    /// Maximum number of breadcrumbs a scope retains (defaults to 100).
    pub max_breadcrumbs: usize,
    /// Callback that is executed before an event is queued for sending.
    pub before_send: Option<Arc<BeforeCallback>>,
    /// Callback that is executed on every breadcrumb before it is
    /// recorded; returning `None` discards it.
    pub before_breadcrumb: Option<Arc<BeforeBreadcrumbCallback>>,
    /// The factory used to build the transport when a client is created.
    pub transport: Option<Arc<dyn TransportFactory>>,
    /// Global event processors installed at client construction.
    pub event_processors: Vec<Arc<dyn EventProcessor>>,
    /// How long the client waits for the transport to drain on shutdown.
    pub shutdown_timeout: Duration,
    /// The user agent that should be reported.
    pub user_agent: Cow<'static, str>,
    /// An optional HTTP proxy to use.
    pub http_proxy: Option<Cow<'static, str>>,
    /// An optional HTTPS proxy to use.
    pub https_proxy: Option<Cow<'static, str>>,
}

impl ClientOptions {
    /// Creates new options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates new options from the given DSN.
    pub fn configure<I: IntoDsn>(dsn: I) -> Self {
        ClientOptions {
            dsn: dsn.into_dsn(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Debug)]
        struct TracesSampler;
        #[derive(Debug)]
        struct BeforeSend;
        #[derive(Debug)]
        struct BeforeBreadcrumb;
        #[derive(Debug)]
        struct TransportFactory;

        f.debug_struct("ClientOptions")
            .field("dsn", &self.dsn)
            .field("debug", &self.debug)
            .field("release", &self.release)
            .field("environment", &self.environment)
            .field("server_name", &self.server_name)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .field(
                "traces_sampler",
                &self.traces_sampler.as_ref().map(|_| TracesSampler),
            )
            .field("max_breadcrumbs", &self.max_breadcrumbs)
            .field("before_send", &self.before_send.as_ref().map(|_| BeforeSend))
            .field(
                "before_breadcrumb",
                &self.before_breadcrumb.as_ref().map(|_| BeforeBreadcrumb),
            )
            .field(
                "transport",
                &self.transport.as_ref().map(|_| TransportFactory),
            )
            .field("event_processors", &self.event_processors.len())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("user_agent", &self.user_agent)
            .field("http_proxy", &self.http_proxy)
            .field("https_proxy", &self.https_proxy)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> ClientOptions {
        ClientOptions {
            dsn: None,
            debug: false,
            release: None,
            environment: None,
            server_name: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
            traces_sampler: None,
            max_breadcrumbs: 100,
            before_send: None,
            before_breadcrumb: None,
            transport: None,
            event_processors: vec![],
            shutdown_timeout: Duration::from_secs(2),
            user_agent: Cow::Borrowed(USER_AGENT),
            http_proxy: None,
            https_proxy: None,
        }
    }
}

impl<T: IntoDsn> From<(T, ClientOptions)> for ClientOptions {
    fn from((into_dsn, mut opts): (T, ClientOptions)) -> ClientOptions {
        opts.dsn = into_dsn.into_dsn();
        opts
    }
}

impl<T: IntoDsn> From<T> for ClientOptions {
    fn from(into_dsn: T) -> ClientOptions {
        ClientOptions {
            dsn: into_dsn.into_dsn(),
            ..ClientOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_options() {
        let opts: ClientOptions = "https://public@example.com/42".into();
        assert!(opts.dsn.is_some());
        assert_eq!(opts.sample_rate, 1.0);
        assert_eq!(opts.traces_sample_rate, 0.0);
        assert_eq!(opts.max_breadcrumbs, 100);

        let opts: ClientOptions = "broken".into();
        assert!(opts.dsn.is_none());
    }
}
