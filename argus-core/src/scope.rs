use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::performance::{SentryTrace, TransactionOrSpan};
use crate::protocol::{Breadcrumb, Event, Level, Map, User, Value};
use crate::stack::Stack;
use crate::EventProcessor;

/// Contextual data attached to every event captured while the scope is
/// active.
///
/// Scopes are cheap to clone: every field is behind an [`Arc`] and
/// mutation copies on write, so a pushed scope shares storage with its
/// parent until one of them diverges.
#[derive(Clone, Default)]
pub struct Scope {
    pub(crate) level: Option<Level>,
    pub(crate) fingerprint: Option<Arc<Vec<Cow<'static, str>>>>,
    pub(crate) transaction: Option<Arc<str>>,
    pub(crate) breadcrumbs: Arc<VecDeque<Breadcrumb>>,
    pub(crate) user: Option<Arc<User>>,
    pub(crate) extra: Arc<Map<String, Value>>,
    pub(crate) tags: Arc<Map<String, String>>,
    pub(crate) contexts: Arc<Map<String, Value>>,
    pub(crate) event_processors: Arc<Vec<Arc<dyn EventProcessor>>>,
    pub(crate) span: Arc<Option<TransactionOrSpan>>,
    pub(crate) propagation_context: SentryTrace,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("level", &self.level)
            .field("fingerprint", &self.fingerprint)
            .field("transaction", &self.transaction)
            .field("breadcrumbs", &self.breadcrumbs)
            .field("user", &self.user)
            .field("extra", &self.extra)
            .field("tags", &self.tags)
            .field("contexts", &self.contexts)
            .field("event_processors", &self.event_processors.len())
            .field("span", &self.span)
            .field("propagation_context", &self.propagation_context)
            .finish()
    }
}

/// A guard returned from [`Hub::push_scope`].
///
/// Pops the pushed scope layer when dropped.
///
/// [`Hub::push_scope`]: crate::Hub::push_scope
#[derive(Default)]
pub struct ScopeGuard(pub(crate) Option<(Arc<RwLock<Stack>>, usize)>);

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeGuard")
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some((stack, depth)) = self.0.take() {
            let popped = crate::hub::write_lock(&stack).pop_if_depth(depth);
            if !popped {
                crate::argus_debug!("scope popped out of order, ignoring");
            }
        }
    }
}

impl Scope {
    /// Clears the scope, resetting it to its pristine state.
    pub fn clear(&mut self) {
        *self = Default::default();
    }

    /// Sets a level override applied to every event captured in scope.
    pub fn set_level(&mut self, level: Option<Level>) {
        self.level = level;
    }

    /// Sets the fingerprint.
    pub fn set_fingerprint(&mut self, fingerprint: Option<&[&str]>) {
        self.fingerprint = fingerprint
            .map(|fp| Arc::new(fp.iter().map(|x| Cow::Owned((*x).to_string())).collect()))
    }

    /// Sets the transaction name.
    pub fn set_transaction(&mut self, transaction: Option<&str>) {
        self.transaction = transaction.map(Arc::from);
        if let Some(name) = transaction {
            let trx = match self.span.as_ref() {
                Some(TransactionOrSpan::Transaction(trx)) => Some(trx),
                _ => None,
            };
            if let Some(trx) = trx {
                trx.set_name(name);
            }
        }
    }

    /// Sets the user for the current scope.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user.map(Arc::new);
    }

    /// Sets a tag to a specific value.
    pub fn set_tag<V: ToString>(&mut self, key: &str, value: V) {
        Arc::make_mut(&mut self.tags).insert(key.to_string(), value.to_string());
    }

    /// Removes a tag.
    pub fn remove_tag(&mut self, key: &str) {
        Arc::make_mut(&mut self.tags).remove(key);
    }

    /// Sets a context value.
    pub fn set_context<V: Into<Value>>(&mut self, key: &str, value: V) {
        Arc::make_mut(&mut self.contexts).insert(key.to_string(), value.into());
    }

    /// Removes a context value.
    pub fn remove_context(&mut self, key: &str) {
        Arc::make_mut(&mut self.contexts).remove(key);
    }

    /// Sets an extra value.
    pub fn set_extra(&mut self, key: &str, value: Value) {
        Arc::make_mut(&mut self.extra).insert(key.to_string(), value);
    }

    /// Removes an extra value.
    pub fn remove_extra(&mut self, key: &str) {
        Arc::make_mut(&mut self.extra).remove(key);
    }

    /// Adds an event processor that runs on every event captured within
    /// this scope, before the client's processors.
    pub fn add_event_processor(&mut self, f: Arc<dyn EventProcessor>) {
        Arc::make_mut(&mut self.event_processors).push(f);
    }

    /// Records a breadcrumb, evicting the oldest once `max_breadcrumbs`
    /// is exceeded.
    pub fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb, max_breadcrumbs: usize) {
        let breadcrumbs = Arc::make_mut(&mut self.breadcrumbs);
        breadcrumbs.push_back(breadcrumb);
        while breadcrumbs.len() > max_breadcrumbs {
            breadcrumbs.pop_front();
        }
    }

    /// Sets the span that events captured in this scope correlate to.
    pub fn set_span(&mut self, span: Option<TransactionOrSpan>) {
        self.span = Arc::new(span);
    }

    /// Returns the currently active span.
    pub fn get_span(&self) -> Option<TransactionOrSpan> {
        self.span.as_ref().clone()
    }

    /// Sets the propagation context used to continue an incoming trace
    /// when no span is active.
    pub fn set_propagation_context(&mut self, trace: SentryTrace) {
        self.propagation_context = trace;
    }

    /// Applies the contained scoped data to fill an event.
    pub fn apply_to_event(&self, mut event: Event) -> Option<Event> {
        // TODO: event really should have an optional level
        if self.level.is_some() {
            event.level = self.level.unwrap_or_default();
        }

        if event.user.is_none() {
            if let Some(user) = self.user.as_deref() {
                event.user = Some(user.clone());
            }
        }

        event
            .breadcrumbs
            .extend(self.breadcrumbs.iter().cloned());
        event
            .extra
            .extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        event
            .tags
            .extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        event
            .contexts
            .extend(self.contexts.iter().map(|(k, v)| (k.clone(), v.clone())));

        if event.transaction.is_none() {
            if let Some(txn) = self.transaction.as_deref() {
                event.transaction = Some(txn.to_owned());
            }
        }

        if event.fingerprint.is_empty() {
            if let Some(fingerprint) = self.fingerprint.as_deref() {
                event.fingerprint = fingerprint.iter().map(|f| f.to_string()).collect();
            }
        }

        if !event.contexts.contains_key("trace") {
            if let Some(span) = self.span.as_ref() {
                event
                    .contexts
                    .insert("trace".into(), span.get_trace_context().into());
            } else {
                event
                    .contexts
                    .insert("trace".into(), self.propagation_context.to_context().into());
            }
        }

        for processor in self.event_processors.as_ref() {
            event = processor.process_event(event)?;
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cow_clones_diverge() {
        let mut base = Scope::default();
        base.set_tag("base", "yes");
        let mut child = base.clone();
        child.set_tag("child", "yes");
        assert!(base.tags.get("child").is_none());
        assert_eq!(child.tags.len(), 2);
    }

    #[test]
    fn test_apply_to_event() {
        let mut scope = Scope::default();
        scope.set_tag("worker", "worker1");
        scope.set_level(Some(Level::Warning));
        scope.set_transaction(Some("checkout"));

        let event = scope.apply_to_event(Event::new()).unwrap();
        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.tags["worker"], "worker1");
        assert_eq!(event.transaction.as_deref(), Some("checkout"));
        // without an active span the propagation context fills in trace
        // correlation
        assert!(event.contexts.contains_key("trace"));
    }

    #[test]
    fn test_event_data_wins_over_scope() {
        let mut scope = Scope::default();
        scope.set_transaction(Some("scoped"));
        let event = Event {
            transaction: Some("explicit".into()),
            ..Event::new()
        };
        let event = scope.apply_to_event(event).unwrap();
        assert_eq!(event.transaction.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_processor_can_drop() {
        let mut scope = Scope::default();
        scope.add_event_processor(Arc::new(|_| None));
        assert!(scope.apply_to_event(Event::new()).is_none());
    }

    #[test]
    fn test_breadcrumb_eviction() {
        let mut scope = Scope::default();
        for i in 0..5 {
            scope.add_breadcrumb(
                Breadcrumb {
                    message: Some(format!("crumb {}", i)),
                    ..Default::default()
                },
                3,
            );
        }
        assert_eq!(scope.breadcrumbs.len(), 3);
        assert_eq!(
            scope.breadcrumbs.front().and_then(|b| b.message.as_deref()),
            Some("crumb 2")
        );
    }
}
