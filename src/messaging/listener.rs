use crate::types::ListenerError;
use futures::future::{self, BoxFuture};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub type ListenerResult = Result<(), ListenerError>;

type Handler<A> = dyn Fn(A) -> BoxFuture<'static, ListenerResult> + Send + Sync;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Async callback registered on the event hub.
///
/// Clones share one identity: registering a clone twice is a no-op, and
/// `off` with any clone removes the registration.
pub struct Listener<A> {
    id: ListenerId,
    handler: Arc<Handler<A>>,
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<A> std::fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

impl<A> Listener<A> {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub(crate) fn call(&self, arg: A) -> BoxFuture<'static, ListenerResult> {
        (self.handler)(arg)
    }
}

impl<A: Send + 'static> Listener<A> {
    /// Wraps an async callback.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        let handler: Arc<Handler<A>> =
            Arc::new(move |arg: A| -> BoxFuture<'static, ListenerResult> { Box::pin(f(arg)) });
        Self {
            id: ListenerId::next(),
            handler,
        }
    }

    /// Wraps a synchronous callback that cannot fail.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::new(move |arg| {
            f(arg);
            future::ready(Ok(()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_identity() {
        let listener = Listener::from_fn(|_: u32| {});
        let other = Listener::from_fn(|_: u32| {});
        assert_eq!(listener.id(), listener.clone().id());
        assert_ne!(listener.id(), other.id());
    }

    #[tokio::test]
    async fn test_listener_result_is_returned() {
        let listener = Listener::new(|n: u32| async move {
            if n == 0 {
                Err::<(), ListenerError>("zero".into())
            } else {
                Ok(())
            }
        });
        assert!(listener.call(1).await.is_ok());
        assert!(listener.call(0).await.is_err());
    }
}
