use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::protocol::{self, Event, Map, SpanId, SpanStatus, TraceContext, TraceId, Value};
use crate::{ClientOptions, Hub};

/// The maximum number of spans recorded per transaction.
///
/// Spans started past this limit still function as timing scopes but
/// are not included in the finished transaction event.
const MAX_SPANS: usize = 100;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The header used for distributed tracing.
const SENTRY_TRACE_HEADER: &str = "sentry-trace";

/// Trace propagation state, either parsed from an incoming
/// `sentry-trace` header or freshly generated.
///
/// The sampling flag is tri-state: an upstream service may not have
/// communicated a decision at all.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryTrace(pub TraceId, pub SpanId, pub Option<bool>);

impl Default for SentryTrace {
    fn default() -> Self {
        SentryTrace(TraceId::default(), SpanId::default(), None)
    }
}

impl SentryTrace {
    /// The trace correlation context for an event captured while no
    /// span is active.
    pub(crate) fn to_context(&self) -> TraceContext {
        TraceContext {
            trace_id: self.0,
            span_id: self.1,
            ..Default::default()
        }
    }
}

impl fmt::Display for SentryTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)?;
        if let Some(sampled) = self.2 {
            write!(f, "-{}", if sampled { '1' } else { '0' })?;
        }
        Ok(())
    }
}

/// Parses a `sentry-trace` header value.
///
/// Returns `None` for anything that is not exactly
/// `<32 hex>-<16 hex>[-<0|1>]`, in which case the caller starts a new
/// trace instead of continuing a corrupt one.
pub fn parse_sentry_trace(header: &str) -> Option<SentryTrace> {
    let header = header.trim();
    let mut parts = header.splitn(3, '-');

    let trace_id = parts.next()?.parse().ok()?;
    let parent_span_id = parts.next()?.parse().ok()?;
    let parent_sampled = match parts.next() {
        None => None,
        Some("1") => Some(true),
        Some("0") => Some(false),
        Some(_) => return None,
    };

    Some(SentryTrace(trace_id, parent_span_id, parent_sampled))
}

/// An iterator over the tracing headers describing a span, suitable
/// for attaching to outgoing requests.
pub struct TraceHeadersIter {
    sentry_trace: Option<String>,
}

impl Iterator for TraceHeadersIter {
    type Item = (&'static str, String);

    fn next(&mut self) -> Option<Self::Item> {
        self.sentry_trace.take().map(|st| (SENTRY_TRACE_HEADER, st))
    }
}

/// The metadata a transaction is started from.
///
/// This is handed to [`Hub::start_transaction`] and, when a
/// `traces_sampler` is configured, to the sampler so it can base its
/// decision on the transaction's name, operation and parent.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    name: String,
    op: String,
    trace_id: TraceId,
    parent_span_id: Option<SpanId>,
    sampled: Option<bool>,
    parent_sampled: Option<bool>,
}

impl TransactionContext {
    /// Creates a new transaction context as the root of a new trace.
    #[must_use = "this must be used with `Hub::start_transaction`"]
    pub fn new(name: &str, op: &str) -> Self {
        TransactionContext {
            name: name.into(),
            op: op.into(),
            trace_id: TraceId::default(),
            parent_span_id: None,
            sampled: None,
            parent_sampled: None,
        }
    }

    /// Creates a new transaction context continuing the trace found in
    /// the given headers.
    ///
    /// Looks for a `sentry-trace` header; if one is present and well
    /// formed the new transaction joins that trace and inherits the
    /// upstream sampling decision. Otherwise this behaves like
    /// [`TransactionContext::new`].
    #[must_use = "this must be used with `Hub::start_transaction`"]
    pub fn continue_from_headers<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(
        name: &str,
        op: &str,
        headers: I,
    ) -> Self {
        let mut trace = None;
        for (k, v) in headers.into_iter() {
            if k.eq_ignore_ascii_case(SENTRY_TRACE_HEADER) {
                trace = parse_sentry_trace(v);
            }
        }

        match trace {
            Some(SentryTrace(trace_id, parent_span_id, parent_sampled)) => TransactionContext {
                name: name.into(),
                op: op.into(),
                trace_id,
                parent_span_id: Some(parent_span_id),
                sampled: None,
                parent_sampled,
            },
            None => Self::new(name, op),
        }
    }

    /// Creates a new transaction context as a child of the given span,
    /// for work that continues a trace inside the same process.
    ///
    /// Inherits the trace id and sampling decision; with no span this
    /// behaves like [`TransactionContext::new`].
    #[must_use = "this must be used with `Hub::start_transaction`"]
    pub fn continue_from_span(name: &str, op: &str, span: Option<&TransactionOrSpan>) -> Self {
        let span = match span {
            Some(span) => span,
            None => return Self::new(name, op),
        };
        let trace = span.get_trace_context();
        TransactionContext {
            name: name.into(),
            op: op.into(),
            trace_id: trace.trace_id,
            parent_span_id: Some(trace.span_id),
            sampled: None,
            parent_sampled: Some(span.is_sampled()),
        }
    }

    /// Forces the sampling decision for this transaction.
    ///
    /// An explicit decision wins over a configured `traces_sampler`,
    /// the inherited parent decision and `traces_sample_rate`.
    pub fn set_sampled(&mut self, sampled: impl Into<Option<bool>>) {
        self.sampled = sampled.into();
    }

    /// The name of the transaction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The operation of the transaction.
    pub fn operation(&self) -> &str {
        &self.op
    }

    /// The trace id of the transaction.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The id of the parent span, if this continues an existing trace.
    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.parent_span_id
    }

    /// The explicitly forced sampling decision, if any.
    pub fn sampled(&self) -> Option<bool> {
        self.sampled
    }

    /// The sampling decision inherited from the parent, if any.
    pub fn parent_sampled(&self) -> Option<bool> {
        self.parent_sampled
    }
}

/// Samples at the given uniform rate.
pub(crate) fn rate_sample(rate: f32) -> bool {
    if rate >= 1.0 {
        true
    } else if rate <= 0.0 {
        false
    } else {
        rand::random::<f32>() < rate
    }
}

/// Resolves the sampling decision for a transaction.
///
/// Precedence: explicit decision on the context, then the configured
/// sampler, then the inherited parent decision, then a draw against
/// `traces_sample_rate`.
pub(crate) fn transaction_sample_decision(
    ctx: &TransactionContext,
    options: &ClientOptions,
) -> bool {
    if let Some(sampled) = ctx.sampled {
        return sampled;
    }
    if let Some(sampler) = options.traces_sampler.as_ref() {
        return sampler(ctx);
    }
    if let Some(sampled) = ctx.parent_sampled {
        return sampled;
    }
    rate_sample(options.traces_sample_rate)
}

type SpanArc = Arc<Mutex<protocol::Span>>;

/// Collects the spans of one transaction as they are started.
///
/// Spans are recorded at creation, so a span that is still running
/// when the transaction finishes is included with no end timestamp.
/// Once [`MAX_SPANS`] spans are recorded further ones are silently not
/// retained.
pub(crate) struct SpanRecorder {
    spans: Mutex<Vec<SpanArc>>,
}

impl SpanRecorder {
    fn new(root: SpanArc) -> Arc<Self> {
        Arc::new(SpanRecorder {
            spans: Mutex::new(vec![root]),
        })
    }

    fn record(&self, span: SpanArc) {
        let mut spans = lock(&self.spans);
        if spans.len() < MAX_SPANS {
            spans.push(span);
        }
    }

    /// A snapshot of all recorded spans except the root.
    fn children(&self, root: SpanId) -> Vec<protocol::Span> {
        lock(&self.spans)
            .iter()
            .map(|s| lock(s).clone())
            .filter(|s| s.span_id != root)
            .collect()
    }
}

struct TransactionInner {
    name: String,
    sampled: bool,
    hub: Option<Arc<Hub>>,
    root: SpanArc,
    recorder: Arc<SpanRecorder>,
}

type TransactionArc = Arc<Mutex<TransactionInner>>;

/// An ongoing transaction, the root of a span tree.
///
/// Clones share the same underlying transaction; finishing is
/// idempotent across clones.
#[derive(Clone)]
pub struct Transaction {
    inner: TransactionArc,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Transaction")
            .field("name", &inner.name)
            .field("sampled", &inner.sampled)
            .finish()
    }
}

impl Transaction {
    pub(crate) fn new(hub: Option<Arc<Hub>>, sampled: bool, ctx: &TransactionContext) -> Self {
        let root = Arc::new(Mutex::new(protocol::Span {
            trace_id: ctx.trace_id,
            parent_span_id: ctx.parent_span_id,
            op: Some(ctx.op.clone()),
            ..Default::default()
        }));
        let recorder = SpanRecorder::new(Arc::clone(&root));
        Transaction {
            inner: Arc::new(Mutex::new(TransactionInner {
                name: ctx.name.clone(),
                sampled,
                hub,
                root,
                recorder,
            })),
        }
    }

    /// Whether the transaction was sampled for sending.
    pub fn is_sampled(&self) -> bool {
        lock(&self.inner).sampled
    }

    /// Renames the transaction.
    pub fn set_name(&self, name: &str) {
        lock(&self.inner).name = name.into();
    }

    /// Sets the final status of the transaction's root span.
    pub fn set_status(&self, status: SpanStatus) {
        let inner = lock(&self.inner);
        lock(&inner.root).status = Some(status);
    }

    /// Attaches a key/value payload to the transaction's root span.
    pub fn set_data(&self, key: &str, value: Value) {
        let inner = lock(&self.inner);
        lock(&inner.root).data.insert(key.into(), value);
    }

    /// Sets a tag on the transaction's root span.
    pub fn set_tag(&self, key: &str, value: String) {
        let inner = lock(&self.inner);
        lock(&inner.root).tags.insert(key.into(), value);
    }

    /// The trace correlation context describing the root span.
    pub fn get_trace_context(&self) -> TraceContext {
        let inner = lock(&self.inner);
        let root = lock(&inner.root);
        span_trace_context(&root)
    }

    /// Starts a new child span of the transaction's root.
    #[must_use = "a span must be explicitly finished"]
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        let inner = lock(&self.inner);
        let root = lock(&inner.root);
        let span = Arc::new(Mutex::new(protocol::Span {
            trace_id: root.trace_id,
            parent_span_id: Some(root.span_id),
            op: Some(op.into()),
            description: if description.is_empty() {
                None
            } else {
                Some(description.into())
            },
            ..Default::default()
        }));
        drop(root);
        inner.recorder.record(Arc::clone(&span));
        Span {
            transaction: Arc::clone(&self.inner),
            sampled: inner.sampled,
            span,
        }
    }

    /// The headers to attach to outgoing requests so downstream
    /// services join this trace.
    pub fn iter_headers(&self) -> TraceHeadersIter {
        let inner = lock(&self.inner);
        let root = lock(&inner.root);
        let trace = SentryTrace(root.trace_id, root.span_id, Some(inner.sampled));
        TraceHeadersIter {
            sentry_trace: Some(trace.to_string()),
        }
    }

    /// Finishes the transaction.
    ///
    /// Records the end timestamp and, if the transaction was sampled,
    /// captures it on the hub it was started from. Finishing a second
    /// time (through a clone) has no effect.
    pub fn finish(self) {
        let mut inner = lock(&self.inner);
        let root = {
            let mut root = lock(&inner.root);
            if root.timestamp.is_some() {
                return;
            }
            root.timestamp = Some(SystemTime::now());
            root.clone()
        };
        if !inner.sampled {
            return;
        }
        let hub = match inner.hub.take() {
            Some(hub) => hub,
            None => return,
        };

        let mut contexts = Map::new();
        contexts.insert("trace".into(), span_trace_context(&root).into());
        let event = Event {
            event_id: argus_types::random_uuid(),
            ty: Some("transaction".into()),
            transaction: Some(inner.name.clone()),
            contexts,
            spans: inner.recorder.children(root.span_id),
            start_timestamp: Some(root.start_timestamp),
            timestamp: root.timestamp.unwrap_or(root.start_timestamp),
            ..Default::default()
        };
        drop(inner);
        hub.capture_event(event);
    }
}

/// A running span inside a transaction.
///
/// The span is already part of its transaction's record; finishing
/// only sets its end timestamp.
#[derive(Clone)]
pub struct Span {
    transaction: TransactionArc,
    sampled: bool,
    span: SpanArc,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("span", &lock(&self.span))
            .field("sampled", &self.sampled)
            .finish()
    }
}

impl Span {
    /// Whether the enclosing transaction was sampled.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// The id of this span.
    pub fn get_span_id(&self) -> SpanId {
        lock(&self.span).span_id
    }

    /// Sets the final status of the span.
    pub fn set_status(&self, status: SpanStatus) {
        lock(&self.span).status = Some(status);
    }

    /// Attaches a key/value payload to the span.
    pub fn set_data(&self, key: &str, value: Value) {
        lock(&self.span).data.insert(key.into(), value);
    }

    /// Sets a tag on the span.
    pub fn set_tag(&self, key: &str, value: String) {
        lock(&self.span).tags.insert(key.into(), value);
    }

    /// The trace correlation context describing this span.
    pub fn get_trace_context(&self) -> TraceContext {
        span_trace_context(&lock(&self.span))
    }

    /// Starts a new child of this span.
    #[must_use = "a span must be explicitly finished"]
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        let (trace_id, parent_span_id) = {
            let span = lock(&self.span);
            (span.trace_id, span.span_id)
        };
        let span = Arc::new(Mutex::new(protocol::Span {
            trace_id,
            parent_span_id: Some(parent_span_id),
            op: Some(op.into()),
            description: if description.is_empty() {
                None
            } else {
                Some(description.into())
            },
            ..Default::default()
        }));
        lock(&self.transaction).recorder.record(Arc::clone(&span));
        Span {
            transaction: Arc::clone(&self.transaction),
            sampled: self.sampled,
            span: Arc::clone(&span),
        }
    }

    /// The headers to attach to outgoing requests so downstream
    /// services join this trace.
    pub fn iter_headers(&self) -> TraceHeadersIter {
        let span = lock(&self.span);
        let trace = SentryTrace(span.trace_id, span.span_id, Some(self.sampled));
        TraceHeadersIter {
            sentry_trace: Some(trace.to_string()),
        }
    }

    /// Finishes the span, recording its end timestamp.
    ///
    /// Finishing twice has no effect.
    pub fn finish(self) {
        let mut span = lock(&self.span);
        if span.timestamp.is_none() {
            span.timestamp = Some(SystemTime::now());
        }
    }
}

fn span_trace_context(span: &protocol::Span) -> TraceContext {
    TraceContext {
        trace_id: span.trace_id,
        span_id: span.span_id,
        parent_span_id: span.parent_span_id,
        op: span.op.clone(),
        description: span.description.clone(),
        status: span.status,
    }
}

/// Either a transaction or one of its spans, for APIs that accept
/// both, such as [`Scope::set_span`].
///
/// [`Scope::set_span`]: crate::Scope::set_span
#[derive(Clone, Debug)]
pub enum TransactionOrSpan {
    /// A transaction.
    Transaction(Transaction),
    /// A span.
    Span(Span),
}

impl From<Transaction> for TransactionOrSpan {
    fn from(transaction: Transaction) -> Self {
        Self::Transaction(transaction)
    }
}

impl From<Span> for TransactionOrSpan {
    fn from(span: Span) -> Self {
        Self::Span(span)
    }
}

impl TransactionOrSpan {
    /// Whether the enclosing transaction was sampled.
    pub fn is_sampled(&self) -> bool {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.is_sampled(),
            TransactionOrSpan::Span(span) => span.is_sampled(),
        }
    }

    /// The trace correlation context of the contained span.
    pub fn get_trace_context(&self) -> TraceContext {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.get_trace_context(),
            TransactionOrSpan::Span(span) => span.get_trace_context(),
        }
    }

    /// Starts a child of the contained span.
    #[must_use = "a span must be explicitly finished"]
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        match self {
            TransactionOrSpan::Transaction(transaction) => {
                transaction.start_child(op, description)
            }
            TransactionOrSpan::Span(span) => span.start_child(op, description),
        }
    }

    /// The headers to attach to outgoing requests so downstream
    /// services join this trace.
    pub fn iter_headers(&self) -> TraceHeadersIter {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.iter_headers(),
            TransactionOrSpan::Span(span) => span.iter_headers(),
        }
    }

    /// Finishes the contained span.
    pub fn finish(self) {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.finish(),
            TransactionOrSpan::Span(span) => span.finish(),
        }
    }
}
