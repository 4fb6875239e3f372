use std::borrow::Cow;
use std::env;
use std::sync::Arc;

use crate::transports::DefaultTransportFactory;
use crate::{ClientOptions, IntoDsn};

/// Fills in the parts of the options the caller left unset.
///
/// The DSN, release and environment fall back to the `ARGUS_DSN`,
/// `ARGUS_RELEASE` and `ARGUS_ENVIRONMENT` environment variables;
/// proxies fall back to the conventional `HTTP_PROXY`/`HTTPS_PROXY`
/// variables; a missing transport becomes the default HTTP transport.
pub fn apply_defaults(mut opts: ClientOptions) -> ClientOptions {
    if opts.dsn.is_none() {
        opts.dsn = env::var("ARGUS_DSN").ok().into_dsn();
    }
    if opts.release.is_none() {
        opts.release = env::var("ARGUS_RELEASE").ok().map(Cow::Owned);
    }
    if opts.environment.is_none() {
        opts.environment = env::var("ARGUS_ENVIRONMENT")
            .ok()
            .map(Cow::Owned)
            .or_else(|| {
                Some(Cow::Borrowed(if cfg!(debug_assertions) {
                    "development"
                } else {
                    "production"
                }))
            });
    }
    if opts.http_proxy.is_none() {
        opts.http_proxy = env::var("HTTP_PROXY")
            .ok()
            .or_else(|| env::var("http_proxy").ok())
            .map(Cow::Owned);
    }
    if opts.https_proxy.is_none() {
        opts.https_proxy = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("https_proxy").ok())
            .map(Cow::Owned)
            .or_else(|| opts.http_proxy.clone());
    }
    if opts.transport.is_none() {
        opts.transport = Some(Arc::new(DefaultTransportFactory));
    }
    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_gaps() {
        let opts = apply_defaults(ClientOptions::default());
        assert!(opts.transport.is_some());
        assert!(opts.environment.is_some());
    }

    #[test]
    fn test_explicit_values_win() {
        let opts = apply_defaults(ClientOptions {
            environment: Some("staging".into()),
            ..Default::default()
        });
        assert_eq!(opts.environment.as_deref(), Some("staging"));
    }
}
