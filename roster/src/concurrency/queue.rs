//! Handoff queue between a producing task and a consuming worker.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

/// Internal queue state guarded by a single lock.
#[derive(Debug)]
struct QueueState<T> {
    backlog: VecDeque<T>,
    stopped: bool,
}

/// Unbounded FIFO queue with cooperative shutdown.
///
/// [`HandoffQueue`] moves items from one or more producing tasks to a consuming
/// worker. Producers never block beyond the brief state lock, the consumer
/// waits without polling, and shutdown is cooperative: [`HandoffQueue::stop`]
/// wakes all waiting consumers but does not discard the backlog, so every item
/// pushed before (or even after) the stop request is still drained in FIFO
/// order before the consumer observes end of stream.
///
/// The queue is deliberately unbounded: producers are never subject to
/// backpressure in this system, where a session submits a single batch.
#[derive(Debug)]
pub struct HandoffQueue<T> {
    state: Mutex<QueueState<T>>,
    item_pushed: Notify,
}

impl<T> HandoffQueue<T> {
    /// Creates an empty, running queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                backlog: VecDeque::new(),
                stopped: false,
            }),
            item_pushed: Notify::new(),
        }
    }

    /// Appends an item to the tail of the queue and wakes one waiting consumer.
    pub async fn push(&self, item: T) {
        let mut state = self.state.lock().await;
        state.backlog.push_back(item);
        drop(state);

        self.item_pushed.notify_one();
    }

    /// Waits until an item is available or shutdown has been requested with an
    /// empty backlog.
    ///
    /// Returns the oldest pending item regardless of shutdown state, so the
    /// backlog is always drained first. Returns [`None`] only once the backlog
    /// is empty and [`HandoffQueue::stop`] has been called; that is the normal
    /// end-of-stream signal, not a failure.
    pub async fn wait_and_pop(&self) -> Option<T> {
        loop {
            // Register wakeup interest before inspecting the state, otherwise a
            // push or stop landing between the inspection and the await below
            // would be lost.
            let notified = self.item_pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(item) = state.backlog.pop_front() {
                    return Some(item);
                }
                if state.stopped {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Requests shutdown and wakes all waiting consumers.
    ///
    /// Idempotent. The backlog is left untouched and remains retrievable
    /// through [`HandoffQueue::wait_and_pop`] until drained.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.stopped = true;
        drop(state);

        self.item_pushed.notify_waiters();
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn drains_pushed_items_in_fifo_order_before_end_of_stream() {
        let queue = HandoffQueue::new();
        for i in 0..5 {
            queue.push(i).await;
        }
        queue.stop().await;

        for i in 0..5 {
            assert_eq!(queue.wait_and_pop().await, Some(i));
        }
        assert_eq!(queue.wait_and_pop().await, None);
    }

    #[tokio::test]
    async fn stop_on_empty_queue_wakes_waiting_consumer() {
        let queue = Arc::new(HandoffQueue::<u32>::new());

        let waiting_queue = queue.clone();
        let consumer = tokio::spawn(async move { waiting_queue.wait_and_pop().await });

        // Give the consumer a chance to block before stopping.
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.stop().await;

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer did not wake after stop")
            .expect("consumer task panicked");
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn push_wakes_waiting_consumer() {
        let queue = Arc::new(HandoffQueue::new());

        let waiting_queue = queue.clone();
        let consumer = tokio::spawn(async move { waiting_queue.wait_and_pop().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(42).await;

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer did not wake after push")
            .expect("consumer task panicked");
        assert_eq!(popped, Some(42));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let queue = HandoffQueue::new();
        queue.push(1).await;
        queue.stop().await;
        queue.stop().await;

        assert_eq!(queue.wait_and_pop().await, Some(1));
        assert_eq!(queue.wait_and_pop().await, None);
        assert_eq!(queue.wait_and_pop().await, None);
    }

    #[tokio::test]
    async fn backlog_pushed_after_stop_is_still_drained() {
        let queue = HandoffQueue::new();
        queue.stop().await;
        queue.push(7).await;

        assert_eq!(queue.wait_and_pop().await, Some(7));
        assert_eq!(queue.wait_and_pop().await, None);
    }
}
