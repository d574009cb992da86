// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Coordination primitives for sequencing asynchronous work.
//!
//! # Overview
//!
//! This crate provides two low-level coordination primitives plus a small
//! persisted document store:
//!
//! - [`TaskQueue`]: fair async mutual exclusion with explicit
//!   acquire/release calls. Unbounded concurrent callers are serialized so
//!   only one proceeds at a time, in strict FIFO order, with a
//!   suspension-free fast path when uncontended.
//! - [`OneShotTimer`]: a cancellable, re-armable deferred callback. At most
//!   one invocation per arming, immune to fire notifications racing with
//!   cancellation, re-arming, or disposal.
//! - [`Document`]: a JSON-backed document tree with typed attribute
//!   accessors, either file-bound or in-memory.
//!
//! The two primitives are independent and composable; typical uses are
//! serializing retries behind a [`TaskQueue`] and debouncing signals with a
//! re-armed [`OneShotTimer`]. Neither holds its internal lock across a
//! suspension point or a user callback, so a resolved waiter or a firing
//! callback can always call straight back into the primitive that woke it.

mod document;
mod queue;
mod timer;

// ── Re-exports ───────────────────────────────────────────────────────

pub use document::{Document, DocumentError, Element};
pub use queue::TaskQueue;
pub use timer::{OneShotTimer, TimerCallback};
