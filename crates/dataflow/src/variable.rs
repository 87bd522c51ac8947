// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Single-assignment dataflow variable.

use std::{
	mem,
	time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use weft_actor::{ActorGroup, Envelope, Message, Recipient};
use weft_core::{
	Result,
	diagnostic::dataflow::{already_bound, bound_to_different_value},
};

use crate::channel::{ReadCallback, ReadChannel, WriteChannel};

type Waiter<T> = Box<dyn FnOnce(&T) + Send>;

enum VarState<T> {
	/// Waiters are delivered in registration order on bind.
	Unbound(Vec<Waiter<T>>),
	Bound(T),
}

/// A write-once slot.
///
/// `bind` succeeds exactly once per lifetime; every blocking reader and
/// every registered callback observes that one value. Blocking readers
/// park on a condition variable, callbacks run on the binder's thread
/// after the state flips, outside the internal lock.
pub struct DataflowVariable<T> {
	state: Mutex<VarState<T>>,
	cond: Condvar,
}

/// The message a variable sends to an actor sink when it gets bound.
pub struct BoundValue<T> {
	/// Identifies the request when one sink serves several channels.
	pub attachment: Option<usize>,
	pub value: T,
}

impl<T: Send + 'static> Message for BoundValue<T> {}

impl<T: Send + Clone + 'static> DataflowVariable<T> {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(VarState::Unbound(Vec::new())),
			cond: Condvar::new(),
		}
	}

	/// Atomically transitions unbound → bound, waking every waiter.
	///
	/// Fails with `FLOW_001` when the variable is already bound.
	pub fn bind(&self, value: T) -> Result<()> {
		let waiters = {
			let mut state = self.state.lock();
			match &mut *state {
				VarState::Bound(_) => return weft_core::err!(already_bound()),
				VarState::Unbound(waiters) => {
					let waiters = mem::take(waiters);
					*state = VarState::Bound(value.clone());
					self.cond.notify_all();
					waiters
				}
			}
		};
		for waiter in waiters {
			waiter(&value);
		}
		Ok(())
	}

	/// Like [`bind`](Self::bind), but tolerates a repeated bind of an
	/// equal value; fails with `FLOW_002` on a different one.
	pub fn bind_unique(&self, value: T) -> Result<()>
	where
		T: PartialEq,
	{
		{
			let state = self.state.lock();
			if let VarState::Bound(existing) = &*state {
				return if *existing == value {
					Ok(())
				} else {
					weft_core::err!(bound_to_different_value())
				};
			}
		}
		// Racing binders are arbitrated by bind itself: the loser
		// re-checks equality against the winner's value.
		match self.bind(value.clone()) {
			Ok(()) => Ok(()),
			Err(_) => {
				let state = self.state.lock();
				match &*state {
					VarState::Bound(existing) if *existing == value => Ok(()),
					_ => weft_core::err!(bound_to_different_value()),
				}
			}
		}
	}

	pub fn is_bound(&self) -> bool {
		matches!(&*self.state.lock(), VarState::Bound(_))
	}

	/// The bound value, if there is one already.
	pub fn try_get(&self) -> Option<T> {
		match &*self.state.lock() {
			VarState::Bound(value) => Some(value.clone()),
			VarState::Unbound(_) => None,
		}
	}

	/// Blocks until bound, then returns the value.
	pub fn get(&self) -> T {
		let mut state = self.state.lock();
		loop {
			if let VarState::Bound(value) = &*state {
				return value.clone();
			}
			self.cond.wait(&mut state);
		}
	}

	/// Blocks until bound or until `timeout` elapses.
	///
	/// Returns `None` on expiry; the caller leaves no waiter behind.
	pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
		let deadline = Instant::now() + timeout;
		let mut state = self.state.lock();
		loop {
			if let VarState::Bound(value) = &*state {
				return Some(value.clone());
			}
			if self.cond.wait_until(&mut state, deadline).timed_out() {
				return match &*state {
					VarState::Bound(value) => Some(value.clone()),
					VarState::Unbound(_) => None,
				};
			}
		}
	}

	/// Runs `callback` with the value once bound.
	///
	/// Runs immediately on the calling thread when already bound,
	/// otherwise later on the binder's thread, in registration order.
	pub fn when_bound(&self, callback: impl FnOnce(T) + Send + 'static) {
		let value = {
			let mut state = self.state.lock();
			match &mut *state {
				VarState::Unbound(waiters) => {
					waiters.push(Box::new(move |value: &T| callback(value.clone())));
					return;
				}
				VarState::Bound(value) => value.clone(),
			}
		};
		callback(value);
	}

	/// Schedules `callback` as a task on the group's pool once bound.
	///
	/// The callback never runs inline, even when the value is already
	/// there.
	pub fn when_bound_on(&self, group: &ActorGroup, callback: impl FnOnce(T) + Send + 'static) {
		let group = group.clone();
		self.when_bound(move |value| group.schedule(move || callback(value)));
	}

	/// Delivers the value to `sink` as a [`BoundValue`] message once
	/// bound.
	pub fn get_async(&self, attachment: Option<usize>, sink: Recipient) {
		self.when_bound(move |value| {
			let _ = sink.accept(Envelope {
				payload: Box::new(BoundValue {
					attachment,
					value,
				}),
				sender: None,
			});
		});
	}
}

impl<T: Send + Clone + 'static> Default for DataflowVariable<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Send + Clone + 'static> ReadChannel<T> for DataflowVariable<T> {
	fn read(&self) -> T {
		self.get()
	}

	fn read_timeout(&self, timeout: Duration) -> Option<T> {
		self.get_timeout(timeout)
	}

	fn read_async(&self, callback: ReadCallback<T>) {
		self.when_bound(callback);
	}
}

impl<T: Send + Clone + 'static> WriteChannel<T> for DataflowVariable<T> {
	fn write(&self, value: T) -> Result<()> {
		self.bind(value)
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc,
			atomic::{AtomicUsize, Ordering},
		},
		thread,
	};

	use weft_testing::wait_for;

	use super::*;

	#[test]
	fn test_bind_then_get() {
		let variable = DataflowVariable::new();

		variable.bind(7).expect("first bind");
		assert_eq!(variable.get(), 7);
		assert!(variable.is_bound());
	}

	#[test]
	fn test_second_bind_fails_and_value_survives() {
		let variable = DataflowVariable::new();

		variable.bind(1).expect("first bind");
		assert_eq!(variable.bind(2).expect_err("second bind").code(), "FLOW_001");
		assert_eq!(variable.get(), 1);
	}

	#[test]
	fn test_bind_unique_tolerates_equal_value() {
		let variable = DataflowVariable::new();

		variable.bind_unique(5).expect("first bind");
		variable.bind_unique(5).expect("equal rebind");
		assert_eq!(variable.bind_unique(6).expect_err("different value").code(), "FLOW_002");
	}

	#[test]
	fn test_get_blocks_until_bound() {
		let variable = Arc::new(DataflowVariable::new());

		let variable_clone = variable.clone();
		let reader = thread::spawn(move || variable_clone.get());

		thread::sleep(Duration::from_millis(10));
		variable.bind(42).expect("bind");
		assert_eq!(reader.join().expect("reader"), 42);
	}

	#[test]
	fn test_get_timeout_returns_none_when_unbound() {
		let variable: DataflowVariable<i32> = DataflowVariable::new();
		assert_eq!(variable.get_timeout(Duration::from_millis(10)), None);
	}

	#[test]
	fn test_waiters_run_in_registration_order() {
		let variable = DataflowVariable::new();
		let order = Arc::new(Mutex::new(Vec::new()));

		for tag in 1..=3 {
			let order = order.clone();
			variable.when_bound(move |_value: i32| order.lock().push(tag));
		}

		variable.bind(0).expect("bind");
		assert_eq!(*order.lock(), vec![1, 2, 3]);
	}

	#[test]
	fn test_when_bound_after_bind_runs_immediately() {
		let variable = DataflowVariable::new();
		variable.bind(9).expect("bind");

		let seen = Arc::new(AtomicUsize::new(0));
		let seen_clone = seen.clone();
		variable.when_bound(move |value| seen_clone.store(value as usize, Ordering::SeqCst));

		assert_eq!(seen.load(Ordering::SeqCst), 9);
	}

	#[test]
	fn test_when_bound_on_schedules_instead_of_inlining() {
		let group = ActorGroup::with_threads("dfv-test", 1);
		let variable = DataflowVariable::new();
		variable.bind(3).expect("bind");

		let seen = Arc::new(AtomicUsize::new(0));
		let seen_clone = seen.clone();
		variable.when_bound_on(&group, move |value| {
			seen_clone.store(value as usize, Ordering::SeqCst);
		});

		wait_for(|| seen.load(Ordering::SeqCst) == 3, "scheduled callback should run");
	}

	#[test]
	fn test_every_reader_sees_the_same_value() {
		let variable = Arc::new(DataflowVariable::new());
		let mut readers = Vec::new();

		for _ in 0..4 {
			let variable = variable.clone();
			readers.push(thread::spawn(move || variable.get()));
		}

		variable.bind("shared".to_string()).expect("bind");
		for reader in readers {
			assert_eq!(reader.join().expect("reader"), "shared");
		}
	}
}
