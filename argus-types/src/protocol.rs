//! The plain data schema of the wire protocol.
//!
//! Everything in here is a passive payload: the client core treats these
//! types as opaque structured data that is enriched, serialized and
//! shipped. The only behavior attached are identifier parsing/formatting
//! helpers used for distributed tracing.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::utils::ts_seconds_float;

/// Alias for the ordered maps used across the protocol.
pub type Map<K, V> = std::collections::BTreeMap<K, V>;

/// Re-export of the free-form JSON value type.
pub use serde_json::Value;

/// Represents the level of severity of an event or breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Indicates very spammy debug information.
    Debug,
    /// Informational messages.
    Info,
    /// A warning.
    Warning,
    /// An error.
    Error,
    /// Similar to an error but indicates a critical event that usually
    /// causes a shutdown.
    Fatal,
}

impl Default for Level {
    fn default() -> Self {
        Level::Error
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Level::Debug => write!(f, "debug"),
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
            Level::Fatal => write!(f, "fatal"),
        }
    }
}

/// Information about the client SDK that captured an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSdkInfo {
    /// The name of the SDK.
    pub name: String,
    /// The version of the SDK.
    pub version: String,
}

/// Represents a single breadcrumb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// The timestamp of the breadcrumb.
    #[serde(with = "ts_seconds_float", default = "SystemTime::now")]
    pub timestamp: SystemTime,
    /// The type of the breadcrumb.
    #[serde(rename = "type")]
    pub ty: String,
    /// The optional category of the breadcrumb.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    /// The non optional level of the breadcrumb.
    #[serde(default)]
    pub level: Level,
    /// An optional human readable message for the breadcrumb.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// Arbitrary breadcrumb data that should be sent along.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub data: Map<String, Value>,
}

impl Default for Breadcrumb {
    fn default() -> Self {
        Breadcrumb {
            timestamp: SystemTime::now(),
            ty: "default".into(),
            category: None,
            level: Level::Info,
            message: None,
            data: Map::new(),
        }
    }
}

/// Represents user data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The ID of the user.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    /// The email address of the user.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    /// The remote ip address of the user.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ip_address: Option<String>,
    /// A human readable username of the user.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
}

/// Represents http request data.
///
/// This is populated by framework adapters; the core only carries it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// The current URL of the request.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    /// The HTTP request method.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub method: Option<String>,
    /// Optionally some attached request data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<String>,
    /// Optionally the encoded query string.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query_string: Option<String>,
    /// An encoded cookie string if available.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cookies: Option<String>,
    /// HTTP request headers.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub headers: Map<String, String>,
    /// Optional server environment data.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub env: Map<String, String>,
}

/// A single frame of a stacktrace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The name of the function if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub function: Option<String>,
    /// The potentially mangled name of the symbol as it appears in an
    /// executable.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub symbol: Option<String>,
    /// The module the frame is contained in.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub module: Option<String>,
    /// The filename (relative or absolute).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filename: Option<String>,
    /// The absolute path of the file.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub abs_path: Option<String>,
    /// The line number within the file.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lineno: Option<u64>,
    /// The column number within the file.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub colno: Option<u64>,
    /// Whether this frame is related to the user's application code
    /// (rather than library or runtime internals).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub in_app: Option<bool>,
    /// Local variables of the frame.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub vars: Map<String, Value>,
}

/// Represents a stacktrace as an ordered sequence of frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stacktrace {
    /// The frames of the stacktrace, oldest call first.
    pub frames: Vec<Frame>,
}

/// Represents a single exception.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    /// The type of the exception.
    #[serde(rename = "type")]
    pub ty: String,
    /// The value of the exception.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
    /// The module of the exception.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub module: Option<String>,
    /// An optional stacktrace.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stacktrace: Option<Stacktrace>,
}

/// Raised when a trace or span id cannot be parsed from a string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid id, expected {0} hexadecimal characters")]
pub struct ParseIdError(usize);

macro_rules! hex_id {
    ($name:ident, $len:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Returns true if the id consists only of zero bytes.
            pub fn is_nil(&self) -> bool {
                self.0 == [0; $len]
            }

            /// Returns the raw bytes of the id.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl Default for $name {
            /// Generates a fresh random id.
            fn default() -> Self {
                Self(crate::random::random_bytes())
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, ParseIdError> {
                if s.len() != $len * 2 {
                    return Err(ParseIdError($len * 2));
                }
                let mut bytes = [0; $len];
                hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseIdError($len * 2))?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_id!(TraceId, 16, "Identifies a trace, shared by every span in a distributed trace.");
hex_id!(SpanId, 8, "Identifies a single span within a trace.");

/// The status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    /// The operation completed successfully.
    Ok,
    /// The operation was cancelled (typically by the caller).
    #[serde(rename = "cancelled")]
    Canceled,
    /// An unknown error raised by APIs that don't return enough error
    /// information.
    Unknown,
    /// The client specified an invalid argument.
    InvalidArgument,
    /// The deadline expired before the operation could complete.
    DeadlineExceeded,
    /// Content was not found or the request was denied for an entire
    /// class of users.
    NotFound,
    /// The entity attempted to be created already exists.
    AlreadyExists,
    /// The caller doesn't have permission to execute the specified
    /// operation.
    PermissionDenied,
    /// A resource has been exhausted.
    ResourceExhausted,
    /// The operation was rejected because the system is not in a state
    /// required for it.
    FailedPrecondition,
    /// The operation was aborted.
    Aborted,
    /// The operation was attempted past the valid range.
    OutOfRange,
    /// The operation is not implemented or not supported/enabled.
    Unimplemented,
    /// Some invariant expected by the underlying system was broken.
    InternalError,
    /// The service is currently unavailable.
    Unavailable,
    /// Unrecoverable data loss or corruption.
    DataLoss,
    /// The request does not have valid authentication credentials.
    Unauthenticated,
}

/// A trace context carried in `Event::contexts["trace"]`, correlating an
/// event to the span that was active when it was captured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceContext {
    /// The trace id.
    pub trace_id: TraceId,
    /// The span id.
    pub span_id: SpanId,
    /// The id of the parent span, absent at the root.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_span_id: Option<SpanId>,
    /// The operation of the span.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub op: Option<String>,
    /// A longer description of the span's operation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// The status of the span.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<SpanStatus>,
}

impl From<TraceContext> for Value {
    fn from(ctx: TraceContext) -> Value {
        serde_json::to_value(ctx).unwrap_or(Value::Null)
    }
}

/// A single timed operation within a trace, in its wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// The id of the span.
    pub span_id: SpanId,
    /// The id of the parent span, absent for the transaction root.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_span_id: Option<SpanId>,
    /// The id of the trace the span belongs to.
    pub trace_id: TraceId,
    /// Short code identifying the type of operation the span is measuring.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub op: Option<String>,
    /// A longer description of the span's operation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// The status of the span.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<SpanStatus>,
    /// Optional tags to be attached to the span.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub tags: Map<String, String>,
    /// The timestamp at the measuring of the span started.
    #[serde(with = "ts_seconds_float", default = "SystemTime::now")]
    pub start_timestamp: SystemTime,
    /// The timestamp at the measuring of the span finished, unset while
    /// the span is still running.
    #[serde(
        with = "ts_seconds_float::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub timestamp: Option<SystemTime>,
    /// Arbitrary data associated with the span.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub data: Map<String, Value>,
}

impl Default for Span {
    fn default() -> Self {
        Span {
            span_id: SpanId::default(),
            parent_span_id: None,
            trace_id: TraceId::default(),
            op: None,
            description: None,
            status: None,
            tags: Map::new(),
            start_timestamp: SystemTime::now(),
            timestamp: None,
            data: Map::new(),
        }
    }
}

fn is_nil_uuid(uuid: &Uuid) -> bool {
    uuid.is_nil()
}

/// Represents a full event, the unit of capture and delivery.
///
/// Error/message events and finished transactions share this one shape;
/// a transaction sets `ty` to `"transaction"` and carries its child
/// spans and start timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The ID of the event.
    #[serde(skip_serializing_if = "is_nil_uuid", default = "Uuid::nil")]
    pub event_id: Uuid,
    /// The type of the event; unset for error/message events,
    /// `"transaction"` for finished span trees.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub ty: Option<String>,
    /// The level of the event.
    #[serde(default)]
    pub level: Level,
    /// An optional fingerprint configuration to override the default.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fingerprint: Vec<String>,
    /// A message to be sent with the event.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// A logger name to be sent with the event.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub logger: Option<String>,
    /// A name of the transaction / context in which the event happened.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transaction: Option<String>,
    /// The server name to be reported.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub server_name: Option<String>,
    /// The release to be sent with the event.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub release: Option<String>,
    /// The environment to be sent with the event.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub environment: Option<String>,
    /// Optionally user data to be sent along.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<User>,
    /// Optionally http request data to be sent along.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request: Option<Request>,
    /// The SDK that is sending the event.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sdk: Option<ClientSdkInfo>,
    /// One or more chained exceptions, outermost last.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub exception: Vec<Exception>,
    /// A list of breadcrumbs.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub breadcrumbs: Vec<Breadcrumb>,
    /// Optional tags to be attached to the event.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub tags: Map<String, String>,
    /// Optional extra information to be sent with the event.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub extra: Map<String, Value>,
    /// Optional contexts, notably the `"trace"` correlation context.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub contexts: Map<String, Value>,
    /// The completed child spans of a transaction event.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub spans: Vec<Span>,
    /// The start time of a transaction event.
    #[serde(
        with = "ts_seconds_float::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub start_timestamp: Option<SystemTime>,
    /// The timestamp of when the event was created (or, for
    /// transactions, finished).
    #[serde(with = "ts_seconds_float", default = "SystemTime::now")]
    pub timestamp: SystemTime,
}

impl Default for Event {
    fn default() -> Self {
        Event {
            event_id: Uuid::nil(),
            ty: None,
            level: Level::default(),
            fingerprint: Vec::new(),
            message: None,
            logger: None,
            transaction: None,
            server_name: None,
            release: None,
            environment: None,
            user: None,
            request: None,
            sdk: None,
            exception: Vec::new(),
            breadcrumbs: Vec::new(),
            tags: Map::new(),
            extra: Map::new(),
            contexts: Map::new(),
            spans: Vec::new(),
            start_timestamp: None,
            timestamp: SystemTime::now(),
        }
    }
}

impl Event {
    /// Creates a new event with a fresh random id.
    pub fn new() -> Event {
        Event {
            event_id: crate::random::random_uuid(),
            ..Default::default()
        }
    }
}
