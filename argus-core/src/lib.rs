//! This crate provides the core of the argus SDK: the hub, scope and
//! client objects, the event pipeline and the tracing model.
//!
//! It contains no transport; use the `argus` crate, which wires in an
//! HTTP transport and sensible defaults, unless you are building a
//! custom integration.
//!
//! # Hubs and scopes
//!
//! Nothing here is ambient: every capture goes through a [`Hub`] you
//! hold explicitly. Create one hub per unit of concurrency with
//! [`Hub::new_from_top`] and pass it along; [`Hub::main`] exists as a
//! process-wide root to derive from.
#![warn(missing_docs)]
#![allow(clippy::needless_doctest_main)]

// the internal diagnostic macro expands to `$crate::log`
#[doc(hidden)]
pub use log;

#[macro_use]
mod macros;

mod client;
mod clientoptions;
mod constants;
mod eventprocessor;
mod exception;
mod hub;
mod intodsn;
mod marshal;
mod performance;
mod scope;
mod stack;
mod transport;

#[cfg(any(test, feature = "test"))]
pub mod test;

pub use crate::client::Client;
pub use crate::clientoptions::{
    BeforeBreadcrumbCallback, BeforeCallback, ClientOptions, TracesSampler,
};
pub use crate::constants::{sdk_info, USER_AGENT, VERSION};
pub use crate::eventprocessor::EventProcessor;
pub use crate::exception::{event_from_error, exceptions_from_error};
pub use crate::hub::Hub;
pub use crate::intodsn::IntoDsn;
pub use crate::marshal::get_request_body_from_event;
pub use crate::performance::{
    parse_sentry_trace, SentryTrace, Span, TraceHeadersIter, Transaction, TransactionContext,
    TransactionOrSpan,
};
pub use crate::scope::{Scope, ScopeGuard};
pub use crate::transport::{Transport, TransportFactory};

/// Re-export of the types the protocol consists of.
pub use argus_types::protocol;
pub use argus_types::{Dsn, Uuid};

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Returns whether diagnostic mode is on.
///
/// This reflects the `debug` flag of the most recently constructed
/// client and controls whether [`argus_debug!`] also writes to stderr.
pub fn debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

pub(crate) fn set_debug_enabled(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}
