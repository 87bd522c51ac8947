// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Worker-pool abstraction.
//!
//! The rest of the workspace schedules work exclusively through the
//! [`Pool`] trait; the pool implementation is replaceable. The default
//! implementation wraps a rayon thread pool with named worker threads.

use std::sync::{
	Arc,
	atomic::{AtomicU64, Ordering},
};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::error;

/// A unit of work submitted to a pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Minimal worker-pool contract.
///
/// Tasks must not assume anything about the thread they run on beyond it
/// being a pool worker; in particular they must not block indefinitely,
/// or they starve every other task sharing the pool.
pub trait Pool: Send + Sync + 'static {
	/// Submits a task for asynchronous execution.
	fn execute(&self, task: Task);

	/// Number of worker threads backing this pool.
	fn parallelism(&self) -> usize;
}

/// Process-wide counter used to name worker threads across all pools.
static THREAD_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_thread_id() -> u64 {
	THREAD_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Configuration for [`DefaultPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
	/// Number of worker threads; 0 selects the rayon default
	/// (one per available core).
	pub threads: usize,
	/// Prefix for worker thread names.
	pub thread_name_prefix: String,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			threads: 0,
			thread_name_prefix: "weft-worker".to_string(),
		}
	}
}

/// The default pool: a dedicated rayon [`ThreadPool`] with named workers.
pub struct DefaultPool {
	pool: ThreadPool,
}

impl DefaultPool {
	/// Creates a pool with the default configuration.
	pub fn new() -> Self {
		Self::with_config(PoolConfig::default())
	}

	/// Creates a pool from the supplied configuration.
	///
	/// # Panics
	///
	/// Panics if the underlying thread pool fails to build.
	pub fn with_config(config: PoolConfig) -> Self {
		let prefix = config.thread_name_prefix.clone();
		let pool = ThreadPoolBuilder::new()
			.num_threads(config.threads)
			.thread_name(move |_| format!("{}-{}", prefix, next_thread_id()))
			.panic_handler(|payload| {
				// A panicking task must never take a worker down.
				let detail = panic_detail(payload.as_ref());
				error!(thread = %thread_name(), detail = %detail, "task panicked on pool worker");
			})
			.build()
			.expect("failed to build worker thread pool");

		Self {
			pool,
		}
	}

	/// Creates a pool with a fixed number of worker threads.
	pub fn with_threads(threads: usize) -> Self {
		Self::with_config(PoolConfig {
			threads,
			..PoolConfig::default()
		})
	}
}

impl Default for DefaultPool {
	fn default() -> Self {
		Self::new()
	}
}

impl Pool for DefaultPool {
	fn execute(&self, task: Task) {
		self.pool.spawn(task);
	}

	fn parallelism(&self) -> usize {
		self.pool.current_num_threads()
	}
}

/// Builds a shareable default pool.
pub fn default_pool() -> Arc<dyn Pool> {
	Arc::new(DefaultPool::new())
}

fn thread_name() -> String {
	std::thread::current().name().unwrap_or("<unnamed>").to_string()
}

pub(crate) fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	};

	use weft_testing::wait_for;

	use super::*;

	#[test]
	fn test_executes_submitted_tasks() {
		let pool = DefaultPool::with_threads(2);
		let counter = Arc::new(AtomicUsize::new(0));

		for _ in 0..16 {
			let counter = counter.clone();
			pool.execute(Box::new(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			}));
		}

		wait_for(|| counter.load(Ordering::SeqCst) == 16, "all tasks should run");
	}

	#[test]
	fn test_worker_threads_are_named() {
		let pool = DefaultPool::with_config(PoolConfig {
			threads: 1,
			thread_name_prefix: "named-pool".to_string(),
		});
		let seen = Arc::new(parking_lot::Mutex::new(String::new()));

		let seen_clone = seen.clone();
		pool.execute(Box::new(move || {
			*seen_clone.lock() = std::thread::current().name().unwrap_or("").to_string();
		}));

		wait_for(|| seen.lock().starts_with("named-pool-"), "worker name should carry the prefix");
	}

	#[test]
	fn test_parallelism_reports_thread_count() {
		let pool = DefaultPool::with_threads(3);
		assert_eq!(pool.parallelism(), 3);
	}

	#[test]
	fn test_survives_panicking_task() {
		let pool = DefaultPool::with_threads(1);
		let counter = Arc::new(AtomicUsize::new(0));

		pool.execute(Box::new(|| panic!("boom")));

		let counter_clone = counter.clone();
		pool.execute(Box::new(move || {
			counter_clone.fetch_add(1, Ordering::SeqCst);
		}));

		wait_for(|| counter.load(Ordering::SeqCst) == 1, "pool should keep running after a panic");
	}
}
