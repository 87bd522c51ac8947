// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Structured concurrency on thread pools.
//!
//! weft offers three cooperating abstractions:
//! - **Actors**: isolated message handlers whose continuation-style
//!   bodies release their worker thread between messages
//!   ([`ActorGroup`], [`react`], [`blocking`](weft_actor::blocking))
//! - **Dataflow channels**: single-assignment variables, queues and
//!   multi-reader streams that synchronize by binding values
//!   ([`DataflowVariable`], [`DataflowQueue`], [`DataflowStream`])
//! - **Dataflow operators**: long-running nodes gathering one value per
//!   input, applying a user function and emitting on outputs, with
//!   bounded parallelism ([`operator`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use weft::{ActorGroup, DataflowQueue, OperatorConfig, OperatorScope, ReadChannel, WriteChannel, operator};
//!
//! let group = ActorGroup::with_threads("example", 4);
//! let numbers = Arc::new(DataflowQueue::<i64>::new());
//! let doubled = Arc::new(DataflowQueue::<i64>::new());
//!
//! let op = operator(
//! 	&group,
//! 	OperatorConfig::new(vec![numbers.clone() as Arc<dyn ReadChannel<i64>>])
//! 		.outputs(vec![doubled.clone() as Arc<dyn WriteChannel<i64>>]),
//! 	|scope: &mut OperatorScope<i64>, x: i64| scope.bind_output(0, x * 2),
//! )
//! .expect("operator");
//!
//! numbers.push(21);
//! assert_eq!(doubled.get(), 42);
//! op.stop();
//! ```

pub use weft_actor::{
	ActorBuilder, ActorGroup, ActorHandle, ActorScope, BlockingActorBuilder, BlockingActorHandle, BlockingScope,
	Envelope, Message, MessageSink, Payload, Reaction, Recipient, WeakActorHandle, default_group, react, react_within,
};
pub use weft_core::{Error, Result, diagnostic};
pub use weft_dataflow::{
	BoundValue, DataflowQueue, DataflowStream, DataflowVariable, Operator, OperatorConfig, OperatorControl,
	OperatorScope, ReadChannel, StreamReadAdapter, StreamWriteAdapter, WriteChannel, from_slice, operator,
};
pub use weft_runtime::{CancellationToken, DefaultPool, Latch, Pool, PoolConfig, Timer, TimerHandle};

/// Re-exported building blocks for embedders replacing parts of the
/// runtime.
pub mod runtime {
	pub use weft_runtime::{pool, timer};
}
