// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Actor groups.
//!
//! A group ties actors to a worker pool: every actor remembers its group
//! at construction and schedules all of its chunks there. The process
//! default group is created lazily and shared by everything that does
//! not ask for its own pool.

use std::sync::Arc;

use once_cell::sync::Lazy;
use weft_core::Result;
use weft_runtime::{DefaultPool, Pool, PoolConfig};

use crate::{
	blocking::{BlockingActorBuilder, BlockingActorHandle, BlockingScope},
	pooled::{ActorBuilder, ActorHandle, ActorScope, Reaction},
};

struct GroupInner {
	name: String,
	pool: Arc<dyn Pool>,
}

/// A named set of actors sharing one worker pool.
#[derive(Clone)]
pub struct ActorGroup {
	inner: Arc<GroupInner>,
}

impl ActorGroup {
	/// Creates a group on an existing pool.
	pub fn new(name: impl Into<String>, pool: Arc<dyn Pool>) -> Self {
		Self {
			inner: Arc::new(GroupInner {
				name: name.into(),
				pool,
			}),
		}
	}

	/// Creates a group with its own default pool of `threads` workers.
	pub fn with_threads(name: impl Into<String>, threads: usize) -> Self {
		let name = name.into();
		let pool = Arc::new(DefaultPool::with_config(PoolConfig {
			threads,
			thread_name_prefix: format!("{}-worker", name),
		}));
		Self::new(name, pool)
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn pool(&self) -> &Arc<dyn Pool> {
		&self.inner.pool
	}

	/// Submits a plain task to the group's pool.
	pub fn schedule(&self, task: impl FnOnce() + Send + 'static) {
		self.inner.pool.execute(Box::new(task));
	}

	/// Builds and starts a continuation actor from its first chunk.
	pub fn actor(&self, body: impl FnOnce(&mut ActorScope) -> Result<Reaction> + Send + 'static) -> Result<ActorHandle> {
		ActorBuilder::new(body).spawn(self)
	}

	/// Builds and starts a blocking actor from its body.
	pub fn blocking_actor(
		&self,
		body: impl FnOnce(&mut BlockingScope) -> Result<()> + Send + 'static,
	) -> Result<BlockingActorHandle> {
		BlockingActorBuilder::new(body).spawn(self)
	}
}

/// The process-wide default group.
pub fn default_group() -> &'static ActorGroup {
	static DEFAULT: Lazy<ActorGroup> = Lazy::new(|| ActorGroup::new("weft-default", Arc::new(DefaultPool::new())));
	&DEFAULT
}
