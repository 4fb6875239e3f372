use std::error::Error;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use argus_types::Uuid;
use lazy_static::lazy_static;

use crate::performance::{transaction_sample_decision, Transaction, TransactionContext};
use crate::protocol::{Breadcrumb, Event, Level};
use crate::stack::Stack;
use crate::{event_from_error, Client, Scope, ScopeGuard};

// a poisoned scope lock only means some unrelated thread panicked
// while holding it; the data is still usable
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

lazy_static! {
    static ref MAIN_HUB: Arc<Hub> = Arc::new(Hub::new(None, Arc::new(Scope::default())));
}

/// The central object each unit of concurrency captures through.
///
/// A hub owns a stack of (client, scope) pairs. Hubs are passed around
/// explicitly: give each thread or task its own hub made with
/// [`Hub::new_from_top`] instead of sharing one, so scope mutations
/// stay local. The hub itself is thread-safe, sharing one across
/// threads is safe but mixes their scope data.
pub struct Hub {
    stack: Arc<RwLock<Stack>>,
    last_event_id: RwLock<Option<Uuid>>,
}

impl Hub {
    /// Creates a new hub from the given client and scope.
    pub fn new(client: Option<Arc<Client>>, scope: Arc<Scope>) -> Hub {
        Hub {
            stack: Arc::new(RwLock::new(Stack::from_client_and_scope(client, scope))),
            last_event_id: RwLock::new(None),
        }
    }

    /// Creates a new hub based on the top scope of the given hub.
    ///
    /// The new hub starts with the same client and a snapshot of the
    /// scope; from then on the two evolve independently.
    pub fn new_from_top<H: AsRef<Hub>>(other: H) -> Hub {
        let hub = other.as_ref();
        let stack = read_lock(&hub.stack);
        let top = stack.top();
        Hub::new(top.client.clone(), Arc::clone(&top.scope))
    }

    /// Returns the process-wide default hub.
    ///
    /// This exists as a convenient root to derive per-task hubs from;
    /// nothing in the SDK consults it implicitly.
    pub fn main() -> Arc<Hub> {
        Arc::clone(&MAIN_HUB)
    }

    /// Returns the currently bound client.
    pub fn client(&self) -> Option<Arc<Client>> {
        read_lock(&self.stack).top().client.clone()
    }

    /// Binds a new client to the hub's top layer.
    pub fn bind_client(&self, client: Option<Arc<Client>>) {
        write_lock(&self.stack).top_mut().client = client;
    }

    /// Returns the id of the last captured event.
    pub fn last_event_id(&self) -> Option<Uuid> {
        *read_lock(&self.last_event_id)
    }

    /// Captures an event on this hub, applying its top scope.
    pub fn capture_event(&self, event: Event) -> Option<Uuid> {
        let (client, scope) = {
            let stack = read_lock(&self.stack);
            let top = stack.top();
            (top.client.clone(), Arc::clone(&top.scope))
        };
        let event_id = client?.capture_event(event, Some(&scope));
        if event_id.is_some() {
            *write_lock(&self.last_event_id) = event_id;
        }
        event_id
    }

    /// Captures an arbitrary message.
    pub fn capture_message(&self, msg: &str, level: Level) -> Option<Uuid> {
        self.capture_event(Event {
            message: Some(msg.to_string()),
            level,
            ..Default::default()
        })
    }

    /// Captures an error, walking its source chain into the event's
    /// exception list.
    pub fn capture_error<E: Error + ?Sized>(&self, error: &E) -> Option<Uuid> {
        self.capture_event(event_from_error(error))
    }

    /// Records a breadcrumb on the top scope, running the client's
    /// `before_breadcrumb` callback first.
    pub fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        let mut stack = write_lock(&self.stack);
        let top = stack.top_mut();
        let options = top.client.as_ref().map(|client| client.options());
        let max_breadcrumbs = options.map(|o| o.max_breadcrumbs).unwrap_or(100);
        if max_breadcrumbs == 0 {
            return;
        }
        let breadcrumb = match options.and_then(|o| o.before_breadcrumb.as_ref()) {
            Some(callback) => match callback(breadcrumb) {
                Some(breadcrumb) => breadcrumb,
                None => {
                    crate::argus_debug!("breadcrumb dropped by before_breadcrumb");
                    return;
                }
            },
            None => breadcrumb,
        };
        Arc::make_mut(&mut top.scope).add_breadcrumb(breadcrumb, max_breadcrumbs);
    }

    /// Pushes a new scope layer that inherits the current one.
    ///
    /// The layer is popped when the returned guard drops.
    pub fn push_scope(&self) -> ScopeGuard {
        let mut stack = write_lock(&self.stack);
        stack.push();
        ScopeGuard(Some((Arc::clone(&self.stack), stack.depth())))
    }

    /// Mutates the top scope in place.
    pub fn configure_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Scope) -> R,
    {
        let mut stack = write_lock(&self.stack);
        f(Arc::make_mut(&mut stack.top_mut().scope))
    }

    /// Runs the callback with a temporarily pushed and configured
    /// scope.
    pub fn with_scope<C, F, R>(&self, scope_config: C, callback: F) -> R
    where
        C: FnOnce(&mut Scope),
        F: FnOnce() -> R,
    {
        let _guard = self.push_scope();
        self.configure_scope(scope_config);
        callback()
    }

    /// Starts a transaction.
    ///
    /// The sampling decision is made here, against the bound client's
    /// options; without a client the transaction is unsampled. The
    /// transaction becomes the top scope's active span, so events
    /// captured while it runs correlate to it.
    pub fn start_transaction(self: &Arc<Self>, ctx: TransactionContext) -> Transaction {
        let sampled = match self.client() {
            Some(client) => transaction_sample_decision(&ctx, client.options()),
            None => false,
        };
        let transaction = Transaction::new(Some(Arc::clone(self)), sampled, &ctx);
        self.configure_scope(|scope| scope.set_span(Some(transaction.clone().into())));
        transaction
    }
}

impl AsRef<Hub> for Hub {
    fn as_ref(&self) -> &Hub {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_isolation() {
        let hub = Hub::new(None, Arc::new(Scope::default()));
        hub.configure_scope(|scope| scope.set_tag("base", "yes"));
        {
            let _guard = hub.push_scope();
            hub.configure_scope(|scope| scope.set_tag("inner", "yes"));
            hub.configure_scope(|scope| assert_eq!(scope.tags.len(), 2));
        }
        hub.configure_scope(|scope| {
            assert_eq!(scope.tags.len(), 1);
            assert!(scope.tags.contains_key("base"));
        });
    }

    #[test]
    fn test_out_of_order_guard_drop() {
        let hub = Hub::new(None, Arc::new(Scope::default()));
        let outer = hub.push_scope();
        let inner = hub.push_scope();
        // dropping the outer guard first must not pop the inner layer
        drop(outer);
        hub.configure_scope(|scope| scope.set_tag("still_inner", "yes"));
        drop(inner);
    }

    #[test]
    fn test_new_from_top_isolates_scope() {
        let hub = Hub::new(None, Arc::new(Scope::default()));
        hub.configure_scope(|scope| scope.set_tag("shared", "yes"));
        let derived = Hub::new_from_top(&hub);
        derived.configure_scope(|scope| scope.set_tag("derived", "yes"));
        hub.configure_scope(|scope| assert!(!scope.tags.contains_key("derived")));
        derived.configure_scope(|scope| assert_eq!(scope.tags.len(), 2));
    }

    #[test]
    fn test_capture_without_client() {
        let hub = Hub::new(None, Arc::new(Scope::default()));
        assert!(hub.capture_message("into the void", Level::Info).is_none());
        assert!(hub.last_event_id().is_none());
    }

    #[test]
    fn test_transaction_without_client_is_unsampled() {
        let hub = Arc::new(Hub::new(None, Arc::new(Scope::default())));
        let mut ctx = TransactionContext::new("name", "op");
        ctx.set_sampled(None);
        let transaction = hub.start_transaction(ctx);
        assert!(!transaction.is_sampled());
    }
}
