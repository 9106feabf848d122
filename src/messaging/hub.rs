use super::listener::{Listener, ListenerId, ListenerResult};
use super::stream::{EventStream, Producer};
use super::{EventName, EventNames};
use crate::types::HubError;
use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Listener receiving every emitted event together with its name
pub type AnyListener<T> = Listener<(EventName, T)>;

struct Registry<T> {
    events: HashMap<EventName, Vec<Listener<T>>>,
    any: Vec<AnyListener<T>>,
    producers: HashMap<EventName, Vec<Arc<Producer<T>>>>,
    any_producers: Vec<Arc<Producer<(EventName, T)>>>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            events: HashMap::new(),
            any: Vec::new(),
            producers: HashMap::new(),
            any_producers: Vec::new(),
        }
    }

    fn remove_listener(&mut self, names: &[EventName], id: ListenerId) {
        for name in names {
            if let Some(listeners) = self.events.get_mut(name) {
                listeners.retain(|listener| listener.id() != id);
                if listeners.is_empty() {
                    self.events.remove(name);
                }
            }
        }
    }

    fn has_listener(&self, name: &EventName, id: ListenerId) -> bool {
        self.events
            .get(name)
            .is_some_and(|listeners| listeners.iter().any(|l| l.id() == id))
    }
}

/// Handle returned by `on`/`on_any` that removes exactly that registration.
#[derive(Clone)]
pub struct Unsubscribe {
    detach: Arc<dyn Fn() + Send + Sync>,
}

impl Unsubscribe {
    pub fn unsubscribe(&self) {
        (self.detach)();
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Unsubscribe")
    }
}

/// Resolves with the payload of the first matching event.
///
/// Resolves to `None` if `off` is called (or the hub is cleared) before
/// any matching event is emitted.
pub struct Once<T> {
    rx: oneshot::Receiver<T>,
    unsubscribe: Unsubscribe,
}

impl<T> Once<T> {
    /// Early unsubscribe.
    pub fn off(&self) {
        self.unsubscribe.unsubscribe();
    }
}

impl<T> Future for Once<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// Async event distribution with push listeners and pull streams over the
/// same events.
///
/// Cloning is cheap; clones share one registry.
pub struct EventHub<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for EventHub<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: Clone + Send + 'static> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn validated(names: impl Into<EventNames>) -> Result<Vec<EventName>, HubError> {
    let names = names.into().into_vec();
    if names.is_empty() {
        return Err(HubError::NoEventNames);
    }
    Ok(names)
}

fn emittable(name: impl Into<EventName>) -> Result<EventName, HubError> {
    let name = name.into();
    if name.is_meta() {
        return Err(HubError::MetaEvent(name));
    }
    Ok(name)
}

impl<T: Clone + Send + 'static> EventHub<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Registers `listener` for one or more events.
    ///
    /// Fails without registering anything when `names` is empty.
    pub fn on(
        &self,
        names: impl Into<EventNames>,
        listener: Listener<T>,
    ) -> Result<Unsubscribe, HubError> {
        let names = validated(names)?;
        {
            let mut registry = self.registry.lock();
            for name in &names {
                let listeners = registry.events.entry(name.clone()).or_default();
                if !listeners.iter().any(|l| l.id() == listener.id()) {
                    listeners.push(listener.clone());
                }
            }
        }

        let weak = Arc::downgrade(&self.registry);
        let id = listener.id();
        Ok(Unsubscribe {
            detach: Arc::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.lock().remove_listener(&names, id);
                }
            }),
        })
    }

    pub fn off(&self, names: impl Into<EventNames>, listener: &Listener<T>) -> Result<(), HubError> {
        let names = validated(names)?;
        self.registry.lock().remove_listener(&names, listener.id());
        Ok(())
    }

    /// Registers a listener for every event except the reserved meta events.
    pub fn on_any(&self, listener: AnyListener<T>) -> Unsubscribe {
        {
            let mut registry = self.registry.lock();
            if !registry.any.iter().any(|l| l.id() == listener.id()) {
                registry.any.push(listener.clone());
            }
        }

        let weak = Arc::downgrade(&self.registry);
        let id = listener.id();
        Unsubscribe {
            detach: Arc::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.lock().any.retain(|l| l.id() != id);
                }
            }),
        }
    }

    pub fn off_any(&self, listener: &AnyListener<T>) {
        self.registry.lock().any.retain(|l| l.id() != listener.id());
    }

    /// Waits for the first of `names` to be emitted, then unsubscribes.
    pub fn once(&self, names: impl Into<EventNames>) -> Result<Once<T>, HubError> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let own_unsubscribe: Arc<Mutex<Option<Unsubscribe>>> = Arc::new(Mutex::new(None));

        let listener = {
            let tx = Arc::clone(&tx);
            let own_unsubscribe = Arc::clone(&own_unsubscribe);
            Listener::from_fn(move |data: T| {
                if let Some(unsubscribe) = own_unsubscribe.lock().take() {
                    unsubscribe.unsubscribe();
                }
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(data);
                }
            })
        };

        let unsubscribe = self.on(names, listener)?;
        if tx.lock().is_some() {
            *own_unsubscribe.lock() = Some(unsubscribe.clone());
        } else {
            // Fired before the handle was stored.
            unsubscribe.unsubscribe();
        }

        Ok(Once { rx, unsubscribe })
    }

    /// Opens a pull stream over `names`.
    pub fn events(&self, names: impl Into<EventNames>) -> Result<EventStream<T>, HubError> {
        let names = validated(names)?;
        let producer = Arc::new(Producer::new());
        {
            let mut registry = self.registry.lock();
            for name in &names {
                registry
                    .producers
                    .entry(name.clone())
                    .or_default()
                    .push(Arc::clone(&producer));
            }
        }

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        let owned = Arc::clone(&producer);
        Ok(EventStream::new(
            producer,
            Box::new(move || {
                let Some(registry) = weak.upgrade() else {
                    return;
                };
                let mut registry = registry.lock();
                for name in &names {
                    if let Some(producers) = registry.producers.get_mut(name) {
                        producers.retain(|p| !Arc::ptr_eq(p, &owned));
                        if producers.is_empty() {
                            registry.producers.remove(name);
                        }
                    }
                }
            }),
        ))
    }

    /// Opens a pull stream over every emitted event.
    pub fn any_events(&self) -> EventStream<(EventName, T)> {
        let producer = Arc::new(Producer::new());
        self.registry
            .lock()
            .any_producers
            .push(Arc::clone(&producer));

        let weak = Arc::downgrade(&self.registry);
        let owned = Arc::clone(&producer);
        EventStream::new(
            producer,
            Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry
                        .lock()
                        .any_producers
                        .retain(|p| !Arc::ptr_eq(p, &owned));
                }
            }),
        )
    }

    /// Delivers `data` to pull streams, then to listeners.
    ///
    /// Pull streams are fed synchronously. The task then yields once,
    /// snapshots the listeners, and invokes every one still registered in
    /// registration order, awaiting them concurrently. Returns the first
    /// listener failure after all of them settled.
    pub async fn emit(&self, name: impl Into<EventName>, data: T) -> Result<(), HubError> {
        let name = emittable(name)?;
        self.feed(&name, &data);
        // Woken streams observe the payload before any listener runs
        tokio::task::yield_now().await;
        self.dispatch(name, data).await
    }

    /// Like [`emit`](Self::emit), but listeners run on a spawned task.
    ///
    /// Pull streams are fed before this returns, so streams see published
    /// events in call order even though listener completions are not
    /// awaited. The handle resolves with the dispatch result.
    pub fn publish(
        &self,
        name: impl Into<EventName>,
        data: T,
    ) -> Result<JoinHandle<Result<(), HubError>>, HubError> {
        let name = emittable(name)?;
        self.feed(&name, &data);
        let hub = self.clone();
        Ok(tokio::spawn(async move { hub.dispatch(name, data).await }))
    }

    fn feed(&self, name: &EventName, data: &T) {
        let registry = self.registry.lock();
        if let Some(producers) = registry.producers.get(name) {
            for producer in producers {
                producer.enqueue(data.clone());
            }
        }
        for producer in &registry.any_producers {
            producer.enqueue((name.clone(), data.clone()));
        }
    }

    async fn dispatch(&self, name: EventName, data: T) -> Result<(), HubError> {
        let (listeners, any_listeners) = {
            let registry = self.registry.lock();
            (
                registry.events.get(&name).cloned().unwrap_or_default(),
                registry.any.clone(),
            )
        };

        let mut calls: Vec<BoxFuture<'static, ListenerResult>> =
            Vec::with_capacity(listeners.len() + any_listeners.len());
        for listener in listeners {
            let registry = Arc::clone(&self.registry);
            let name = name.clone();
            let data = data.clone();
            calls.push(Box::pin(async move {
                if !registry.lock().has_listener(&name, listener.id()) {
                    return Ok(());
                }
                listener.call(data).await
            }));
        }
        for listener in any_listeners {
            let registry = Arc::clone(&self.registry);
            let name = name.clone();
            let data = data.clone();
            calls.push(Box::pin(async move {
                let registered = registry.lock().any.iter().any(|l| l.id() == listener.id());
                if !registered {
                    return Ok(());
                }
                listener.call((name, data)).await
            }));
        }

        let mut first_error = None;
        for result in join_all(calls).await {
            if let Err(e) = result
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }
        match first_error {
            Some(e) => Err(HubError::Listener(e)),
            None => Ok(()),
        }
    }

    /// Removes every listener and finishes every pull stream.
    pub fn clear(&self) {
        let mut registry = self.registry.lock();
        registry.events.clear();
        registry.any.clear();
        for producer in registry.producers.values().flatten() {
            producer.finish();
        }
        for producer in &registry.any_producers {
            producer.finish();
        }
        registry.producers.clear();
        registry.any_producers.clear();
    }

    /// Number of listeners registered for `name`, excluding `on_any` listeners.
    pub fn listener_count(&self, name: impl Into<EventName>) -> usize {
        self.registry
            .lock()
            .events
            .get(&name.into())
            .map_or(0, Vec::len)
    }

    pub fn any_listener_count(&self) -> usize {
        self.registry.lock().any.len()
    }

    /// Number of active pull streams watching `name`.
    pub fn producer_count(&self, name: impl Into<EventName>) -> usize {
        self.registry
            .lock()
            .producers
            .get(&name.into())
            .map_or(0, Vec::len)
    }
}
