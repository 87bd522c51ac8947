// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Dataflow channels and operators.
//!
//! Synchronization happens by binding values, never by sharing state:
//! - [`DataflowVariable`]: a write-once slot with blocking, timed and
//!   asynchronous reads
//! - [`DataflowQueue`]: a multi-producer single-consumer channel that
//!   matches producers with waiting consumers
//! - [`DataflowStream`]: a functional cons-list every reader traverses
//!   independently, all observing the same binding order
//! - [`operator`]: long-running nodes that gather one value per input
//!   channel, apply a user function and emit on output channels, with
//!   optional bounded parallelism
//!
//! Channels are wired into operators through the [`ReadChannel`] and
//! [`WriteChannel`] traits.

pub mod adapter;
pub mod channel;
pub mod operator;
pub mod queue;
pub mod stream;
pub mod variable;

pub use adapter::{StreamReadAdapter, StreamWriteAdapter};
pub use channel::{ReadCallback, ReadChannel, WriteChannel};
pub use operator::{Operator, OperatorConfig, OperatorControl, OperatorScope, from_slice, operator};
pub use queue::DataflowQueue;
pub use stream::DataflowStream;
pub use variable::{BoundValue, DataflowVariable};
