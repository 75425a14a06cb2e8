//! FIFO hand-off of received payloads to the application.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use tokio::sync::Notify;


#[derive(Default)]
pub struct DataQueue {
    items: Mutex<VecDeque<Bytes>>,
    available: Notify,
}

impl DataQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, data: Bytes) {
        self.lock().push_back(data);
        self.available.notify_one();
    }

    /// Wait for and remove the oldest payload.
    pub async fn pop(&self) -> Bytes {
        loop {
            if let Some(data) = self.try_pop() {
                return data;
            }

            self.available.notified().await;
        }
    }

    pub fn try_pop(&self) -> Option<Bytes> {
        let mut items = self.lock();
        let data = items.pop_front();

        // pass the wake-up on to the next consumer
        if data.is_some() && !items.is_empty() {
            self.available.notify_one();
        }

        data
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}


#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_fifo() {
        let queue = DataQueue::new();
        queue.push(Bytes::from_static(b"one"));
        queue.push(Bytes::from_static(b"two"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().await, "one");
        assert_eq!(queue.try_pop(), Some(Bytes::from_static(b"two")));
        assert_eq!(queue.try_pop(), None);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_waits() {
        let queue = Arc::new(DataQueue::new());

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                queue.push(Bytes::from_static(b"late"));
            })
        };

        assert_eq!(queue.pop().await, "late");
        producer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiple_consumers() {
        let queue = Arc::new(DataQueue::new());

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.pop().await })
            })
            .collect();

        tokio::task::yield_now().await;

        for i in 0..3u8 {
            queue.push(Bytes::from(vec![i]));
        }

        let mut received = Vec::new();
        for consumer in consumers {
            received.push(consumer.await.unwrap()[0]);
        }
        received.sort_unstable();

        assert_eq!(received, [0, 1, 2]);
        assert!(queue.is_empty());
    }
}
