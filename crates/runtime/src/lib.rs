// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Execution substrate for the weft workspace.
//!
//! This crate owns everything below the actor and dataflow layers:
//! - [`Pool`]: the minimal worker-pool contract the rest of the workspace
//!   is written against, plus the rayon-backed [`DefaultPool`]
//! - [`Timer`]: a shared timer thread for delayed tasks with cancellable
//!   [`TimerHandle`]s
//! - [`CancellationToken`]: cooperative shutdown signalling
//! - [`Latch`]: a one-shot gate used for joins and completion waits

pub mod cancel;
pub mod latch;
pub mod pool;
pub mod timer;

pub use cancel::CancellationToken;
pub use latch::Latch;
pub use pool::{DefaultPool, Pool, PoolConfig, Task};
pub use timer::{Timer, TimerHandle};
