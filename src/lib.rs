//! Argus is an error and performance monitoring client.
//!
//! This crate ties together the core of the SDK with an HTTP transport
//! and default configuration. The quickest way to get going:
//!
//! ```
//! let _guard = argus::init("https://key@example.com/42");
//! ```
//!
//! The returned guard shuts the client down when dropped, flushing any
//! queued events, so keep it alive for the duration of the program.
//!
//! # Capturing
//!
//! All capturing goes through a [`Hub`] you hold explicitly. [`init`]
//! binds the client to [`Hub::main`]; derive one hub per thread or
//! task from it with [`Hub::new_from_top`] so scope changes stay
//! local:
//!
//! ```
//! use std::sync::Arc;
//!
//! # let _guard = argus::init(argus::ClientOptions::default());
//! let hub = Arc::new(argus::Hub::new_from_top(argus::Hub::main()));
//! hub.configure_scope(|scope| scope.set_tag("worker", "billing-1"));
//! hub.capture_message("billing job failed", argus::protocol::Level::Error);
//! ```
//!
//! # Tracing
//!
//! Transactions measure operations and carry a tree of spans. They are
//! started from a hub and finished explicitly:
//!
//! ```
//! use std::sync::Arc;
//!
//! # let _guard = argus::init(argus::ClientOptions::default());
//! let hub = Arc::new(argus::Hub::new_from_top(argus::Hub::main()));
//! let transaction = hub.start_transaction(argus::TransactionContext::new(
//!     "checkout",
//!     "http.server",
//! ));
//! let span = transaction.start_child("db.query", "SELECT * FROM carts");
//! span.finish();
//! transaction.finish();
//! ```
//!
//! Incoming `sentry-trace` headers continue a distributed trace via
//! [`TransactionContext::continue_from_headers`]; the matching
//! outgoing headers come from `iter_headers` on a transaction or span.
//!
//! # Features
//!
//! - `transport` (default): the `ureq` based HTTP transport.
//! - `test`: an in-memory transport and capture helpers for testing.
#![warn(missing_docs)]

mod defaults;
mod init;
pub mod transports;

pub use crate::defaults::apply_defaults;
pub use crate::init::{init, ClientInitGuard};

// this is the api surface of the core, which this crate completes
// with transports and defaults
pub use argus_core::{
    argus_debug, event_from_error, exceptions_from_error, parse_sentry_trace, protocol,
    release_name, sdk_info, BeforeBreadcrumbCallback, BeforeCallback, Client, ClientOptions, Dsn,
    EventProcessor, Hub,
    IntoDsn, Scope, ScopeGuard, SentryTrace, Span, TraceHeadersIter, TracesSampler, Transaction,
    TransactionContext, TransactionOrSpan, Transport, TransportFactory, Uuid, USER_AGENT, VERSION,
};

#[cfg(feature = "test")]
pub use argus_core::test;
