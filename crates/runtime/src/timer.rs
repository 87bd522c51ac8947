// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Shared timer for delayed tasks.
//!
//! One timer thread serves the whole process: delayed tasks are kept in a
//! deadline-ordered heap and executed on the timer thread when they come
//! due. Tasks must be short — typically they only flip some state and
//! resubmit work to a pool. Each scheduled task returns a [`TimerHandle`]
//! that can cancel it before it fires.

use std::{
	cmp::Ordering as CmpOrdering,
	collections::BinaryHeap,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	thread,
	time::{Duration, Instant},
};

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// Handle to a scheduled delayed task.
///
/// Can be used to cancel the task before it fires.
#[derive(Clone)]
pub struct TimerHandle {
	id: u64,
	cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
	fn new(id: u64) -> Self {
		Self {
			id,
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Cancels the task.
	///
	/// Returns `true` if the task had not been cancelled before. A task
	/// that already fired is unaffected.
	pub fn cancel(&self) -> bool {
		self.cancelled
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_ok()
	}

	/// Checks whether this task has been cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	/// The task's unique id.
	pub fn id(&self) -> u64 {
		self.id
	}
}

impl std::fmt::Debug for TimerHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TimerHandle")
			.field("id", &self.id)
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}

/// Counter for generating unique timer ids.
static TIMER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_timer_id() -> u64 {
	TIMER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct Entry {
	deadline: Instant,
	id: u64,
	cancelled: Arc<AtomicBool>,
	task: Box<dyn FnOnce() + Send>,
}

impl PartialEq for Entry {
	fn eq(&self, other: &Self) -> bool {
		self.deadline == other.deadline && self.id == other.id
	}
}

impl Eq for Entry {}

impl PartialOrd for Entry {
	fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
		Some(self.cmp(other))
	}
}

impl Ord for Entry {
	fn cmp(&self, other: &Self) -> CmpOrdering {
		// Earliest deadline first: reverse so the heap pops the
		// soonest entry. Ties resolve in scheduling order.
		match other.deadline.cmp(&self.deadline) {
			CmpOrdering::Equal => other.id.cmp(&self.id),
			ordering => ordering,
		}
	}
}

struct TimerState {
	heap: BinaryHeap<Entry>,
}

struct TimerInner {
	state: Mutex<TimerState>,
	cond: Condvar,
}

/// A timer executing delayed tasks on a dedicated thread.
pub struct Timer {
	inner: Arc<TimerInner>,
}

impl Timer {
	/// Creates a timer backed by a new thread with the given name.
	pub fn new(thread_name: &str) -> Self {
		let inner = Arc::new(TimerInner {
			state: Mutex::new(TimerState {
				heap: BinaryHeap::new(),
			}),
			cond: Condvar::new(),
		});

		let worker = inner.clone();
		thread::Builder::new()
			.name(thread_name.to_string())
			.spawn(move || run_timer_loop(worker))
			.expect("failed to spawn timer thread");

		Self {
			inner,
		}
	}

	/// Schedules `task` to run after `delay` on the timer thread.
	///
	/// Returns a handle that can cancel the task before it fires.
	pub fn schedule(&self, delay: Duration, task: impl FnOnce() + Send + 'static) -> TimerHandle {
		let handle = TimerHandle::new(next_timer_id());
		let deadline = Instant::now() + delay;

		trace!(id = handle.id(), delay_ms = delay.as_millis() as u64, "scheduling delayed task");

		let mut state = self.inner.state.lock();
		state.heap.push(Entry {
			deadline,
			id: handle.id(),
			cancelled: handle.cancelled.clone(),
			task: Box::new(task),
		});
		drop(state);
		self.inner.cond.notify_one();

		handle
	}
}

fn run_timer_loop(inner: Arc<TimerInner>) {
	loop {
		let task = {
			let mut state = inner.state.lock();
			loop {
				let now = Instant::now();
				match state.heap.peek() {
					None => {
						inner.cond.wait(&mut state);
					}
					Some(entry) if entry.deadline <= now => {
						let entry = state.heap.pop().expect("peeked entry must pop");
						break entry;
					}
					Some(entry) => {
						let deadline = entry.deadline;
						inner.cond.wait_until(&mut state, deadline);
					}
				}
			}
		};

		if !task.cancelled.load(Ordering::SeqCst) {
			(task.task)();
		}
	}
}

/// The process-wide shared timer.
pub fn shared() -> &'static Timer {
	static TIMER: Lazy<Timer> = Lazy::new(|| Timer::new("weft-timer"));
	&TIMER
}
