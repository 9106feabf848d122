use futures::Stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Per-consumer queue feeding one `EventStream`.
pub(crate) struct Producer<T> {
    state: Mutex<ProducerState<T>>,
}

struct ProducerState<T> {
    /// `None` once the consumer stopped iterating
    queue: Option<VecDeque<T>>,
    finished: bool,
    waiter: Option<Waker>,
}

impl<T> Producer<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ProducerState {
                queue: Some(VecDeque::new()),
                finished: false,
                waiter: None,
            }),
        }
    }

    pub(crate) fn enqueue(&self, item: T) {
        let mut state = self.state.lock();
        if let Some(queue) = state.queue.as_mut() {
            queue.push_back(item);
            if let Some(waker) = state.waiter.take() {
                waker.wake();
            }
        }
    }

    /// Ends the stream once its queue drains.
    pub(crate) fn finish(&self) {
        let mut state = self.state.lock();
        state.finished = true;
        if let Some(waker) = state.waiter.take() {
            waker.wake();
        }
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        state.queue = None;
        if let Some(waker) = state.waiter.take() {
            waker.wake();
        }
    }

    fn poll_advance(&self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut state = self.state.lock();
        let finished = state.finished;
        let Some(queue) = state.queue.as_mut() else {
            return Poll::Ready(None);
        };
        if let Some(item) = queue.pop_front() {
            return Poll::Ready(Some(item));
        }
        if finished {
            state.queue = None;
            return Poll::Ready(None);
        }
        state.waiter = Some(cx.waker().clone());
        Poll::Pending
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.state.lock().queue.as_ref().map_or(0, VecDeque::len)
    }
}

type Detach = Box<dyn FnOnce() + Send>;

/// Pull-based sequence of events.
///
/// Every stream owns its own queue, so two streams over the same event name
/// both see every payload emitted after they were created. Dropping the
/// stream stops it.
pub struct EventStream<T> {
    producer: Arc<Producer<T>>,
    detach: Option<Detach>,
}

impl<T> EventStream<T> {
    pub(crate) fn new(producer: Arc<Producer<T>>, detach: Detach) -> Self {
        Self {
            producer,
            detach: Some(detach),
        }
    }

    /// Waits for the next payload. Returns `None` once the stream is
    /// finished or stopped.
    pub async fn advance(&mut self) -> Option<T> {
        poll_fn(|cx| self.producer.poll_advance(cx)).await
    }

    /// Deregisters this stream from every event it was watching and
    /// discards anything still queued. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.producer.stop();
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.detach.is_none()
    }
}

impl<T> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.producer.poll_advance(cx)
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn stream() -> (Arc<Producer<u32>>, EventStream<u32>, Arc<AtomicBool>) {
        let producer = Arc::new(Producer::new());
        let detached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&detached);
        let stream = EventStream::new(
            Arc::clone(&producer),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        (producer, stream, detached)
    }

    #[tokio::test]
    async fn test_queued_items_come_out_in_order() {
        let (producer, mut stream, _) = stream();
        producer.enqueue(1);
        producer.enqueue(2);
        assert_eq!(stream.advance().await, Some(1));
        assert_eq!(stream.advance().await, Some(2));
        assert!(stream.advance().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_enqueue_wakes_pending_advance() {
        let (producer, mut stream, _) = stream();
        let handle = tokio::spawn(async move { stream.advance().await });
        tokio::task::yield_now().await;
        producer.enqueue(9);
        assert_eq!(handle.await.unwrap(), Some(9));
    }

    #[tokio::test]
    async fn test_finish_drains_then_ends() {
        let (producer, mut stream, _) = stream();
        producer.enqueue(1);
        producer.finish();
        assert_eq!(stream.advance().await, Some(1));
        assert_eq!(stream.advance().await, None);
        producer.enqueue(2);
        assert_eq!(stream.advance().await, None);
    }

    #[test]
    fn test_stop_detaches_once_and_drops_queue() {
        let (producer, mut stream, detached) = stream();
        producer.enqueue(1);
        stream.stop();
        stream.stop();
        assert!(detached.load(Ordering::SeqCst));
        assert!(stream.is_stopped());
        assert_eq!(producer.queued(), 0);
        assert_eq!(stream.advance().now_or_never(), Some(None));
    }

    #[test]
    fn test_drop_detaches() {
        let (_producer, stream, detached) = stream();
        drop(stream);
        assert!(detached.load(Ordering::SeqCst));
    }
}
