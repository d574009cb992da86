// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Fair serialization of async callers through explicit acquire/release.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Serializes an unbounded number of concurrent callers so that only one runs
/// its critical section at a time.
///
/// Unlike a scoped mutex guard, entry and exit are explicit calls: a caller
/// awaits [`acquire`](Self::acquire), performs its work, then hands the
/// section to the next caller with [`release`](Self::release). Waiters are
/// woken in the exact order their `acquire` call ran, and the section is
/// handed off directly from holder to waiter, so it is never observed unheld
/// while anyone is queued.
///
/// When the section is free, `acquire` resolves immediately without
/// suspending.
#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
}

#[derive(Debug, Default)]
struct QueueState {
    running: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl TaskQueue {
    /// Creates an idle queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the critical section.
    ///
    /// Resolves immediately when the section is free; otherwise the caller is
    /// queued and woken by a later [`release`](Self::release), strictly in
    /// FIFO order. There is no timeout and no way to abandon a queued slot;
    /// dropping the returned future mid-wait corrupts the handoff order and
    /// is reported as a panic by the releasing side.
    pub async fn acquire(&self) {
        let waiter = {
            let mut state = self.state.lock();
            if !state.running {
                state.running = true;
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::trace!(queued = state.waiters.len(), "caller queued behind holder");
            rx
        };
        // The lock is released before this await.
        waiter
            .await
            .expect("queue dropped while a caller was waiting for the critical section");
    }

    /// Relinquishes the critical section.
    ///
    /// Hands the section to the oldest waiter if one is queued, otherwise
    /// marks it free. Calling this without holding the section is a no-op.
    pub fn release(&self) {
        let next = {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            let next = state.waiters.pop_front();
            if next.is_none() {
                // No one waiting, the section becomes free.
                state.running = false;
            }
            // Otherwise ownership transfers directly; `running` stays true.
            next
        };
        if let Some(waiter) = next {
            // Resolved outside the lock so the woken caller can immediately
            // call back into the queue without contending with this section.
            if waiter.send(()).is_err() {
                panic!("dequeued a waiter that was already consumed; queue state is corrupted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use futures::FutureExt;
    use tokio::task::yield_now;

    #[tokio::test]
    async fn uncontended_acquire_resolves_immediately() {
        let queue = TaskQueue::new();
        assert!(queue.acquire().now_or_never().is_some());
        // Held now, so a second acquire must suspend.
        assert!(queue.acquire().now_or_never().is_none());
    }

    #[tokio::test]
    async fn release_hands_off_in_call_order() {
        let queue = Arc::new(TaskQueue::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        queue.acquire().await;

        let mut joins = Vec::new();
        for n in 0..3 {
            let queue = Arc::clone(&queue);
            let order = Arc::clone(&order);
            joins.push(tokio::spawn(async move {
                queue.acquire().await;
                order.lock().push(n);
            }));
        }
        // Let all three enqueue, in spawn order, before releasing.
        yield_now().await;

        for _ in 0..4 {
            queue.release();
            yield_now().await;
        }
        for join in joins {
            join.await.unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn one_holder_at_a_time() {
        let queue = Arc::new(TaskQueue::new());
        let holders = Arc::new(AtomicUsize::new(0));

        let mut joins = Vec::new();
        for _ in 0..8 {
            let queue = Arc::clone(&queue);
            let holders = Arc::clone(&holders);
            joins.push(tokio::spawn(async move {
                queue.acquire().await;
                assert_eq!(holders.fetch_add(1, Ordering::SeqCst), 0);
                yield_now().await;
                assert_eq!(holders.fetch_sub(1, Ordering::SeqCst), 1);
                queue.release();
            }));
        }
        for join in joins {
            join.await.unwrap();
        }
        assert_eq!(holders.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_enqueued_waiter_is_woken() {
        let queue = Arc::new(TaskQueue::new());
        let done = Arc::new(AtomicUsize::new(0));

        queue.acquire().await;

        let mut joins = Vec::new();
        for _ in 0..16 {
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&done);
            joins.push(tokio::spawn(async move {
                queue.acquire().await;
                done.fetch_add(1, Ordering::SeqCst);
                queue.release();
            }));
        }
        yield_now().await;

        queue.release();
        for join in joins {
            join.await.unwrap();
        }
        assert_eq!(done.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn release_without_acquire_is_harmless() {
        let queue = TaskQueue::new();
        queue.release();
        queue.release();
        // Still fully functional afterwards.
        assert!(queue.acquire().now_or_never().is_some());
        queue.release();
        assert!(queue.acquire().now_or_never().is_some());
    }

    #[tokio::test]
    #[should_panic(expected = "already consumed")]
    async fn abandoned_waiter_is_fatal_on_handoff() {
        let queue = TaskQueue::new();
        queue.acquire().await;

        // Poll a second acquire once so it enqueues, then drop it.
        assert!(queue.acquire().now_or_never().is_none());

        queue.release();
    }
}
