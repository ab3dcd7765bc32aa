// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Outbound request queue.
//!
//! Many producers, one consumer. `push` never blocks; `pop` waits until a
//! request is available and is safe to cancel (a request is only removed
//! when `pop` returns it).
//!
//! The queue outlives individual connections: requests queued while the
//! link is down are written in order once it comes back.
//!
//! # Bound
//!
//! Unbounded by default. With `max_pending` set, `push` refuses new
//! requests with [`LinkError::QueueFull`] instead of dropping queued ones;
//! the producer decides whether to retry or give up.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::codec::Request;
use crate::error::{LinkError, LinkResult};

/// FIFO of pending requests.
#[derive(Debug)]
pub struct RequestQueue {
    items: Mutex<VecDeque<Request>>,
    notify: Notify,
    max_pending: Option<usize>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl RequestQueue {
    /// Creates an unbounded queue.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Creates a queue with an optional bound.
    pub fn new(max_pending: Option<usize>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            max_pending,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Appends a request.
    pub fn push(&self, request: Request) -> LinkResult<()> {
        {
            let mut items = self.items.lock();
            if let Some(capacity) = self.max_pending {
                if items.len() >= capacity {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    return Err(LinkError::QueueFull { capacity });
                }
            }
            items.push_back(request);
        }
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        Ok(())
    }

    /// Removes the oldest request without waiting.
    pub fn try_pop(&self) -> Option<Request> {
        self.items.lock().pop_front()
    }

    /// Waits for and removes the oldest request.
    pub async fn pop(&self) -> Request {
        loop {
            if let Some(request) = self.try_pop() {
                return request;
            }
            self.notify.notified().await;
        }
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Configured bound, if any.
    pub fn max_pending(&self) -> Option<usize> {
        self.max_pending
    }

    /// Requests accepted since creation.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Requests refused because the queue was full.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Drops every queued request and returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let removed = items.len();
        items.clear();
        removed
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn request(payload: &str) -> Request {
        Request::new(payload).unwrap()
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = RequestQueue::unbounded();
        for i in 0..10 {
            queue.push(request(&format!("R{i}"))).unwrap();
        }
        for i in 0..10 {
            assert_eq!(queue.pop().await.payload(), format!("R{i}"));
        }
        assert!(queue.is_empty());
        assert_eq!(queue.accepted(), 10);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(RequestQueue::unbounded());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::task::yield_now().await;
        queue.push(request("LATE")).unwrap();

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped.payload(), "LATE");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_pop_does_not_lose_requests() {
        let queue = RequestQueue::unbounded();

        let result = tokio::time::timeout(Duration::from_millis(10), queue.pop()).await;
        assert!(result.is_err());

        queue.push(request("A")).unwrap();
        queue.push(request("B")).unwrap();
        assert_eq!(queue.pop().await.payload(), "A");
        assert_eq!(queue.pop().await.payload(), "B");
    }

    #[test]
    fn test_bounded_queue_rejects_without_dropping() {
        let queue = RequestQueue::new(Some(2));
        queue.push(request("A")).unwrap();
        queue.push(request("B")).unwrap();

        let error = queue.push(request("C")).unwrap_err();
        assert_eq!(error, LinkError::QueueFull { capacity: 2 });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.rejected(), 1);
        assert_eq!(queue.try_pop().unwrap().payload(), "A");
    }

    #[test]
    fn test_clear() {
        let queue = RequestQueue::unbounded();
        queue.push(request("A")).unwrap();
        queue.push(request("B")).unwrap();
        assert_eq!(queue.clear(), 2);
        assert!(queue.try_pop().is_none());
    }
}
