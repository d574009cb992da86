// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Cancellable, re-armable one-shot deferred callbacks.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// The procedure a [`OneShotTimer`] runs when its countdown elapses.
///
/// Exactly one variant is chosen at construction and stays fixed for the
/// lifetime of the timer; re-arming never swaps the callback.
pub enum TimerCallback {
    /// Plain procedure, run inline on the timer's task.
    Sync(Box<dyn Fn() + Send + Sync>),
    /// Future-producing procedure, awaited on the timer's task.
    Async(Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>),
}

impl TimerCallback {
    /// Wraps a synchronous procedure.
    pub fn sync<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::Sync(Box::new(callback))
    }

    /// Wraps an asynchronous procedure.
    pub fn async_fn<F, Fut>(callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Async(Box::new(move || Box::pin(callback())))
    }

    async fn invoke(&self) {
        match self {
            Self::Sync(callback) => callback(),
            Self::Async(callback) => callback().await,
        }
    }
}

impl fmt::Debug for TimerCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("TimerCallback::Sync"),
            Self::Async(_) => f.write_str("TimerCallback::Async"),
        }
    }
}

/// Runs a fixed callback once, `delay` after the most recent [`arm`] call.
///
/// The timer can be re-armed before it fires (restarting the countdown from
/// scratch) and cancelled while pending. Each arming produces at most one
/// invocation: a fire notification is consumed under the same lock that
/// [`arm`], [`cancel_if_pending`] and [`dispose`] mutate, and every arming
/// carries a generation number, so a notification from a cancelled or
/// superseded countdown is discarded rather than attributed to a newer one.
///
/// The callback itself always runs with the lock released, so it may safely
/// re-arm or cancel the very timer that invoked it. Once an invocation has
/// begun it runs to completion; cancellation only prevents invocations that
/// have not started yet.
///
/// [`arm`]: Self::arm
/// [`cancel_if_pending`]: Self::cancel_if_pending
/// [`dispose`]: Self::dispose
#[derive(Debug)]
pub struct OneShotTimer {
    inner: Arc<TimerInner>,
}

#[derive(Debug)]
struct TimerInner {
    delay: Duration,
    callback: TimerCallback,
    state: Mutex<TimerState>,
}

#[derive(Debug, Default)]
struct TimerState {
    armed: bool,
    /// Bumped on every arm and every successful cancellation. A countdown
    /// captures the value current at its arming and may only invoke the
    /// callback while it still matches.
    epoch: u64,
    disposed: bool,
    /// The pending countdown task. Owned exclusively by this timer; aborted
    /// when the countdown it runs is no longer wanted, released on disposal.
    countdown: Option<JoinHandle<()>>,
}

/// Outcome of checking a fire notification against the timer state.
#[derive(Debug, PartialEq)]
enum FireDecision {
    Invoke,
    Discard,
}

impl OneShotTimer {
    /// Creates an idle timer. `delay` and `callback` are fixed for the
    /// timer's lifetime.
    pub fn new(delay: Duration, callback: TimerCallback) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                delay,
                callback,
                state: Mutex::new(TimerState::default()),
            }),
        }
    }

    /// (Re)starts the countdown: the callback will run `delay` after this
    /// call.
    ///
    /// Arming an already-armed timer stops the in-flight countdown first;
    /// the window always measures from the latest call, never the first.
    /// Ignored on a disposed timer.
    ///
    /// The countdown runs as a spawned task, so this must be called from
    /// within a Tokio runtime.
    pub fn arm(&self) {
        let mut state = self.inner.state.lock();
        if state.disposed {
            tracing::debug!("arm on a disposed timer ignored");
            return;
        }
        if state.armed {
            // Restart, not merge: the old countdown must never fire.
            if let Some(countdown) = state.countdown.take() {
                countdown.abort();
            }
        }
        state.armed = true;
        state.epoch += 1;
        let epoch = state.epoch;
        tracing::trace!(epoch, delay_ms = self.inner.delay.as_millis() as u64, "countdown armed");

        let inner = Arc::clone(&self.inner);
        state.countdown = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            inner.fire(epoch).await;
        }));
    }

    /// Stops a pending countdown.
    ///
    /// Returns `true` when an armed countdown was actually cancelled, in
    /// which case the callback is guaranteed not to run for that arming,
    /// even if its fire notification was already in flight. Returns `false`
    /// when nothing is pending: never armed, already fired, already
    /// cancelled, or disposed.
    pub fn cancel_if_pending(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.disposed || !state.armed {
            return false;
        }
        state.armed = false;
        state.epoch += 1;
        // `armed` was still set, so the countdown cannot have begun its
        // invocation yet; aborting it here never kills a running callback.
        if let Some(countdown) = state.countdown.take() {
            countdown.abort();
        }
        tracing::trace!(epoch = state.epoch, "pending countdown cancelled");
        true
    }

    /// True while a countdown is pending: between an [`arm`](Self::arm) call
    /// and that arming's firing, cancellation, or the timer's disposal.
    pub fn is_armed(&self) -> bool {
        self.inner.state.lock().armed
    }

    /// Tears the timer down: stops any pending countdown and releases the
    /// countdown task.
    ///
    /// Idempotent. All later calls on the timer are ignored. An invocation
    /// that already consumed its fire notification runs to completion; one
    /// that has not will never start.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        let countdown = state.countdown.take();
        if state.armed {
            state.armed = false;
            state.epoch += 1;
            if let Some(countdown) = countdown {
                countdown.abort();
            }
        }
        // When not armed the handle is merely dropped: a callback mid-flight
        // keeps running, it only detaches from the timer.
        tracing::debug!("timer disposed");
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl TimerInner {
    /// Consumes a fire notification for the arming identified by `epoch`.
    ///
    /// The armed check and the callback run on opposite sides of the lock:
    /// the check-and-flip is atomic with arm/cancel/dispose, while the
    /// callback executes unlocked so it can call back into the timer.
    async fn fire(&self, epoch: u64) {
        let decision = {
            let mut state = self.state.lock();
            if state.disposed || !state.armed || state.epoch != epoch {
                // A cancellation, re-arm, or disposal raced ahead of this
                // notification; swallow it without touching the callback.
                tracing::trace!(epoch, current = state.epoch, "stale fire notification discarded");
                FireDecision::Discard
            } else {
                state.armed = false;
                FireDecision::Invoke
            }
        };
        if decision == FireDecision::Invoke {
            self.callback.invoke().await;
        }
    }
}
