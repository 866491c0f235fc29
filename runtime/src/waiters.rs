//! Request/response waiters.
//!
//! A waiter is registered before its request is sent and holds a predicate
//! plus a one-shot reply slot. Every action produced by an effect is offered
//! to the registry after its fold; the first action a waiter's predicate
//! accepts is delivered to that waiter alone and the waiter is removed. No
//! buffer sits between the fold and the waiter, so a burst of settling
//! requests cannot push a waiter's answer out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::oneshot;

type Matcher<A> = Box<dyn Fn(&A) -> bool + Send + Sync>;

struct Waiter<A> {
    id: u64,
    matches: Matcher<A>,
    reply: oneshot::Sender<A>,
}

/// Registry of pending waiters shared by every clone of a Store.
pub(crate) struct Waiters<A> {
    next_id: AtomicU64,
    pending: Mutex<Vec<Waiter<A>>>,
}

impl<A: Clone + Send + 'static> Waiters<A> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Register a waiter and return the ticket that receives its action.
    pub(crate) fn register<F>(registry: &Arc<Self>, matches: F) -> Ticket<A>
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let id = registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, receiver) = oneshot::channel();
        registry
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Waiter {
                id,
                matches: Box::new(matches),
                reply,
            });

        Ticket {
            id,
            receiver,
            registry: Arc::downgrade(registry),
        }
    }

    /// Deliver `action` to every waiter that accepts it, returning how many.
    pub(crate) fn complete(&self, action: &A) -> usize {
        let accepted: Vec<Waiter<A>> = {
            let mut pending = self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let (accepted, rest): (Vec<Waiter<A>>, Vec<Waiter<A>>) = std::mem::take(&mut *pending)
                .into_iter()
                .partition(|waiter| (waiter.matches)(action));
            *pending = rest;
            accepted
        };

        let delivered = accepted.len();
        for waiter in accepted {
            // The ticket may have timed out and gone away
            let _ = waiter.reply.send(action.clone());
        }
        delivered
    }

    /// Number of waiters still pending.
    pub(crate) fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn remove(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|waiter| waiter.id != id);
    }
}

/// Receiving end of a registered waiter.
///
/// Dropping the ticket, for example when its timeout expires, removes the
/// waiter from the registry.
pub(crate) struct Ticket<A: Clone + Send + 'static> {
    id: u64,
    receiver: oneshot::Receiver<A>,
    registry: Weak<Waiters<A>>,
}

impl<A: Clone + Send + 'static> Ticket<A> {
    /// Wait for the accepted action; `None` if the registry went away.
    pub(crate) async fn recv(&mut self) -> Option<A> {
        (&mut self.receiver).await.ok()
    }
}

impl<A: Clone + Send + 'static> Drop for Ticket<A> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_only_matching_waiter_receives() {
        let registry = Arc::new(Waiters::<u32>::new());
        let mut even = Waiters::register(&registry, |v: &u32| v % 2 == 0);
        let odd = Waiters::register(&registry, |v: &u32| v % 2 == 1);

        assert_eq!(registry.complete(&4), 1);

        assert_eq!(even.recv().await, Some(4));
        assert_eq!(registry.len(), 1);
        drop(odd);
    }

    #[tokio::test]
    async fn test_waiter_receives_once() {
        let registry = Arc::new(Waiters::<u32>::new());
        let mut ticket = Waiters::register(&registry, |_: &u32| true);

        assert_eq!(registry.complete(&1), 1);
        assert_eq!(registry.complete(&2), 0);
        assert_eq!(ticket.recv().await, Some(1));
    }

    #[tokio::test]
    async fn test_dropped_ticket_leaves_registry() {
        let registry = Arc::new(Waiters::<u32>::new());
        let ticket = Waiters::register(&registry, |_: &u32| true);
        assert_eq!(registry.len(), 1);

        drop(ticket);

        assert_eq!(registry.len(), 0);
        assert_eq!(registry.complete(&1), 0);
    }

    #[tokio::test]
    async fn test_many_waiters_none_lost() {
        let registry = Arc::new(Waiters::<u32>::new());
        let mut tickets: Vec<_> = (0..500u32)
            .map(|n| Waiters::register(&registry, move |v: &u32| *v == n))
            .collect();

        for n in (0..500u32).rev() {
            assert_eq!(registry.complete(&n), 1);
        }

        for (n, ticket) in (0..500u32).zip(tickets.iter_mut()) {
            assert_eq!(ticket.recv().await, Some(n));
        }
        assert_eq!(registry.len(), 0);
    }
}
