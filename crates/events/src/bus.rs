//! Typed publish/subscribe bus
//!
//! The bus is the single point of coordination between the orchestration
//! engine and independent observers. It is an explicit object owned by the
//! composition root and passed by handle, not a hidden ambient singleton;
//! tests construct a fresh bus per test.

use pakt_errors::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type DynHandler = Box<dyn Fn(&dyn Any) + Send + Sync>;

struct SubscriptionEntry {
    id: u64,
    /// Cleared on disposal. Checked per invocation during delivery so a
    /// subscription removed mid-publish is skipped for the rest of that
    /// publish call.
    live: AtomicBool,
    deliver: DynHandler,
}

#[derive(Default)]
struct Registry {
    subscriptions: HashMap<TypeId, Vec<Arc<SubscriptionEntry>>>,
    next_id: u64,
}

fn lock_registry(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide typed publish/subscribe bus.
///
/// Cloning is cheap and every clone shares the same subscription registry.
/// Registration and disposal may happen concurrently with publication from
/// other tasks; delivery for a single `publish` iterates a stable snapshot
/// taken under the registry lock, with handlers invoked after the lock is
/// released so they may subscribe or unsubscribe re-entrantly.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    /// Create a bus with no subscriptions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every subsequently published message of type
    /// `M`. Messages published before this call are never delivered.
    ///
    /// Handler errors are swallowed after a `warn` log; use
    /// [`EventBus::subscribe_with`] to observe them.
    pub fn subscribe<M, H>(&self, handler: H) -> SubscriptionToken
    where
        M: Any,
        H: Fn(&M) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe_with::<M, _, fn(&Error), fn(&M) -> bool>(handler, None, None)
    }

    /// Register `handler` for messages of type `M` accepted by `filter`.
    pub fn subscribe_filtered<M, H, F>(&self, handler: H, filter: F) -> SubscriptionToken
    where
        M: Any,
        H: Fn(&M) -> Result<()> + Send + Sync + 'static,
        F: Fn(&M) -> bool + Send + Sync + 'static,
    {
        self.subscribe_with::<M, _, fn(&Error), _>(handler, None, Some(filter))
    }

    /// Full registration form: handler, optional error handler, optional
    /// predicate filter.
    ///
    /// When the handler returns an error it is routed to `error_handler` if
    /// present and otherwise logged and discarded; either way delivery
    /// continues to the remaining subscribers.
    pub fn subscribe_with<M, H, E, F>(
        &self,
        handler: H,
        error_handler: Option<E>,
        filter: Option<F>,
    ) -> SubscriptionToken
    where
        M: Any,
        H: Fn(&M) -> Result<()> + Send + Sync + 'static,
        E: Fn(&Error) + Send + Sync + 'static,
        F: Fn(&M) -> bool + Send + Sync + 'static,
    {
        let deliver: DynHandler = Box::new(move |message: &dyn Any| {
            let Some(message) = message.downcast_ref::<M>() else {
                return;
            };
            if let Some(filter) = &filter {
                if !filter(message) {
                    return;
                }
            }
            if let Err(error) = handler(message) {
                match &error_handler {
                    Some(error_handler) => error_handler(&error),
                    None => {
                        tracing::warn!(%error, "event subscriber failed; delivery continues");
                    }
                }
            }
        });

        let mut registry = lock_registry(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        let entry = Arc::new(SubscriptionEntry {
            id,
            live: AtomicBool::new(true),
            deliver,
        });
        registry
            .subscriptions
            .entry(TypeId::of::<M>())
            .or_default()
            .push(entry);

        SubscriptionToken {
            id,
            type_id: TypeId::of::<M>(),
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `message` synchronously to every live subscription for its
    /// type, in registration order. Fire-and-forget: the message is not
    /// retained after delivery, and publishing with zero subscribers is a
    /// no-op.
    pub fn publish<M: Any>(&self, message: M) {
        let snapshot: Vec<Arc<SubscriptionEntry>> = {
            let registry = lock_registry(&self.registry);
            registry
                .subscriptions
                .get(&TypeId::of::<M>())
                .cloned()
                .unwrap_or_default()
        };

        if snapshot.is_empty() {
            return;
        }
        tracing::trace!(
            message_type = std::any::type_name::<M>(),
            subscribers = snapshot.len(),
            "publishing event"
        );

        for entry in snapshot {
            if entry.live.load(Ordering::Acquire) {
                (entry.deliver)(&message);
            }
        }
    }

    /// Number of live subscriptions for message type `M`
    #[must_use]
    pub fn subscriber_count<M: Any>(&self) -> usize {
        let registry = lock_registry(&self.registry);
        registry
            .subscriptions
            .get(&TypeId::of::<M>())
            .map_or(0, Vec::len)
    }
}

/// Token returned by the subscribe family; disposing it removes the
/// registration.
///
/// Disposal is idempotent and explicit: dropping the token does nothing,
/// the subscription stays live until [`SubscriptionToken::dispose`] is
/// called or the process ends.
pub struct SubscriptionToken {
    id: u64,
    type_id: TypeId,
    registry: Weak<Mutex<Registry>>,
}

impl SubscriptionToken {
    /// Remove the registration. Calling this twice is a no-op, not an error.
    pub fn dispose(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = lock_registry(&registry);
        if let Some(entries) = registry.subscriptions.get_mut(&self.type_id) {
            if let Some(pos) = entries.iter().position(|entry| entry.id == self.id) {
                entries[pos].live.store(false, Ordering::Release);
                entries.remove(pos);
            }
        }
    }

    /// True once the registration has been removed (or the bus is gone)
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return true;
        };
        let registry = lock_registry(&registry);
        registry
            .subscriptions
            .get(&self.type_id)
            .is_none_or(|entries| entries.iter().all(|entry| entry.id != self.id))
    }
}

impl std::fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionToken")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
