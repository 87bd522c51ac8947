// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Multi-producer single-consumer dataflow queue.
//!
//! The queue matches producers and consumers through two internal FIFOs
//! under one lock: `values` holds bound variables waiting for readers,
//! `requests` holds unbound variables owed to readers that arrived
//! first. A producer satisfies the oldest request when one exists,
//! otherwise it appends to `values`; a consumer symmetrically takes the
//! oldest value or enqueues a request. At most one of the two FIFOs is
//! ever non-empty.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
use weft_actor::Recipient;
use weft_core::Result;

use crate::{
	channel::{ReadCallback, ReadChannel, WriteChannel},
	variable::DataflowVariable,
};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct QueueState<T> {
	/// Bound variables ready to be read.
	values: VecDeque<Arc<DataflowVariable<T>>>,
	/// Unbound variables owed to waiting readers.
	requests: VecDeque<Arc<DataflowVariable<T>>>,
}

/// An unbounded channel synchronizing producers with consumers.
pub struct DataflowQueue<T> {
	state: Mutex<QueueState<T>>,
	/// Fired for every value pushed after registration.
	listeners: RwLock<Vec<Listener<T>>>,
}

/// Pops the oldest slot from `from`, or parks a fresh one in `to`.
fn transfer<T: Send + Clone + 'static>(
	from: &mut VecDeque<Arc<DataflowVariable<T>>>,
	to: &mut VecDeque<Arc<DataflowVariable<T>>>,
) -> Arc<DataflowVariable<T>> {
	match from.pop_front() {
		Some(slot) => slot,
		None => {
			let slot = Arc::new(DataflowVariable::new());
			to.push_back(slot.clone());
			slot
		}
	}
}

impl<T: Send + Clone + 'static> DataflowQueue<T> {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(QueueState {
				values: VecDeque::new(),
				requests: VecDeque::new(),
			}),
			listeners: RwLock::new(Vec::new()),
		}
	}

	/// The slot a producer binds into: the oldest unsatisfied request,
	/// or a fresh variable appended to `values`.
	fn retrieve_for_bind(&self) -> Arc<DataflowVariable<T>> {
		let mut state = self.state.lock();
		let QueueState {
			values,
			requests,
		} = &mut *state;
		transfer(requests, values)
	}

	/// The slot a consumer waits on: the oldest value, or a fresh
	/// request appended to `requests`.
	fn retrieve_or_create(&self) -> Arc<DataflowVariable<T>> {
		let mut state = self.state.lock();
		let QueueState {
			values,
			requests,
		} = &mut *state;
		transfer(values, requests)
	}

	fn hook_listeners(&self, slot: &Arc<DataflowVariable<T>>) {
		for listener in self.listeners.read().iter() {
			let listener = listener.clone();
			slot.when_bound(move |value| listener(&value));
		}
	}

	/// Appends one value, handing it straight to a waiting reader when
	/// one is there.
	pub fn push(&self, value: T) -> &Self {
		let slot = self.retrieve_for_bind();
		self.hook_listeners(&slot);
		slot.bind(value).expect("queue slots bind exactly once");
		self
	}

	/// Subscribes to `source`: its next value lands in this queue.
	///
	/// The slot is claimed synchronously, so concurrent pushes keep
	/// their submission order even when the source binds later.
	pub fn push_channel(&self, source: &dyn ReadChannel<T>) -> &Self {
		let slot = self.retrieve_for_bind();
		self.hook_listeners(&slot);
		source.read_async(Box::new(move |value| {
			slot.bind(value).expect("queue slots bind exactly once");
		}));
		self
	}

	/// Takes the next value, blocking until one is available.
	pub fn get(&self) -> T {
		self.retrieve_or_create().get()
	}

	/// Takes the next value or gives up after `timeout`.
	///
	/// An expired wait removes its request slot so no producer binds
	/// into a reader that is gone.
	pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
		let slot = self.retrieve_or_create();
		if let Some(value) = slot.get_timeout(timeout) {
			return Some(value);
		}
		{
			let mut state = self.state.lock();
			if !slot.is_bound() {
				state.requests.retain(|request| !Arc::ptr_eq(request, &slot));
				return None;
			}
		}
		// Bound in the gap between expiry and the re-check.
		Some(slot.get())
	}

	/// Delivers the next value to an actor sink once available.
	pub fn get_async(&self, attachment: Option<usize>, sink: Recipient) {
		self.retrieve_or_create().get_async(attachment, sink);
	}

	/// Runs `callback` with the next value once available.
	pub fn when_bound(&self, callback: impl FnOnce(T) + Send + 'static) {
		self.retrieve_or_create().when_bound(callback);
	}

	/// Fires `listener` for every value pushed from now on.
	pub fn whenever_bound(&self, listener: impl Fn(&T) + Send + Sync + 'static) {
		self.listeners.write().push(Arc::new(listener));
	}

	/// Pops the head value if it is already bound.
	pub fn poll(&self) -> Option<T> {
		let mut state = self.state.lock();
		match state.values.front() {
			Some(head) if head.is_bound() => {
				let head = state.values.pop_front().expect("non-empty after peek");
				drop(state);
				head.try_get()
			}
			_ => None,
		}
	}

	/// Number of values waiting to be read (snapshot).
	pub fn len(&self) -> usize {
		self.state.lock().values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Iterates over a snapshot of the buffered values.
	///
	/// `next()` blocks on each element until it is bound.
	pub fn iter(&self) -> QueueIter<T> {
		let snapshot: Vec<_> = self.state.lock().values.iter().cloned().collect();
		QueueIter {
			slots: snapshot.into_iter(),
		}
	}

	#[cfg(test)]
	fn request_count(&self) -> usize {
		self.state.lock().requests.len()
	}
}

impl<T: Send + Clone + 'static> Default for DataflowQueue<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// Snapshot iterator over a queue's buffered values.
pub struct QueueIter<T> {
	slots: std::vec::IntoIter<Arc<DataflowVariable<T>>>,
}

impl<T: Send + Clone + 'static> Iterator for QueueIter<T> {
	type Item = T;

	fn next(&mut self) -> Option<T> {
		self.slots.next().map(|slot| slot.get())
	}
}

impl<T: Send + Clone + 'static> ReadChannel<T> for DataflowQueue<T> {
	fn read(&self) -> T {
		self.get()
	}

	fn read_timeout(&self, timeout: Duration) -> Option<T> {
		self.get_timeout(timeout)
	}

	fn read_async(&self, callback: ReadCallback<T>) {
		self.retrieve_or_create().read_async(callback);
	}
}

impl<T: Send + Clone + 'static> WriteChannel<T> for DataflowQueue<T> {
	fn write(&self, value: T) -> Result<()> {
		self.push(value);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::atomic::{AtomicUsize, Ordering},
		thread,
	};

	use weft_testing::wait_for;

	use super::*;

	#[test]
	fn test_push_then_get_in_fifo_order() {
		let queue = DataflowQueue::new();

		queue.push(1).push(2).push(3);

		assert_eq!(queue.len(), 3);
		assert_eq!(queue.get(), 1);
		assert_eq!(queue.get(), 2);
		assert_eq!(queue.get(), 3);
		assert!(queue.is_empty());
	}

	#[test]
	fn test_reader_parks_until_producer_arrives() {
		let queue = Arc::new(DataflowQueue::new());

		let queue_clone = queue.clone();
		let reader = thread::spawn(move || queue_clone.get());

		thread::sleep(Duration::from_millis(10));
		queue.push(99);
		assert_eq!(reader.join().expect("reader"), 99);
	}

	#[test]
	fn test_at_most_one_internal_fifo_is_non_empty() {
		let queue = DataflowQueue::new();

		queue.push(1);
		assert_eq!(queue.len(), 1);
		assert_eq!(queue.request_count(), 0);

		let _ = queue.get();
		queue.get_async(None, Arc::new(NullSink));
		queue.get_async(None, Arc::new(NullSink));
		assert_eq!(queue.len(), 0);
		assert_eq!(queue.request_count(), 2);

		// Producers satisfy the two requests before buffering anything.
		queue.push(1).push(2).push(3);
		assert_eq!(queue.request_count(), 0);
		assert_eq!(queue.len(), 1);
	}

	struct NullSink;
	impl weft_actor::MessageSink for NullSink {
		fn accept(&self, _env: weft_actor::Envelope) -> Result<()> {
			Ok(())
		}
	}

	#[test]
	fn test_get_timeout_removes_stale_request() {
		let queue: DataflowQueue<i32> = DataflowQueue::new();

		assert_eq!(queue.get_timeout(Duration::from_millis(10)), None);
		assert_eq!(queue.request_count(), 0);

		// The next push must not vanish into the expired request.
		queue.push(5);
		assert_eq!(queue.get(), 5);
	}

	#[test]
	fn test_poll_returns_only_bound_heads() {
		let queue: DataflowQueue<i32> = DataflowQueue::new();

		assert_eq!(queue.poll(), None);
		queue.push(4);
		assert_eq!(queue.poll(), Some(4));
		assert_eq!(queue.poll(), None);
	}

	#[test]
	fn test_whenever_bound_sees_every_later_push() {
		let queue = DataflowQueue::new();
		let sum = Arc::new(AtomicUsize::new(0));

		let sum_clone = sum.clone();
		queue.whenever_bound(move |value: &usize| {
			sum_clone.fetch_add(*value, Ordering::SeqCst);
		});

		queue.push(1).push(2).push(3);
		wait_for(|| sum.load(Ordering::SeqCst) == 6, "listener should see all pushes");
	}

	#[test]
	fn test_push_channel_preserves_submission_order() {
		let queue = DataflowQueue::new();
		let source = DataflowVariable::new();

		// The subscription claims the first slot before the direct push.
		queue.push_channel(&source);
		queue.push(2);

		source.bind(1).expect("bind source");
		assert_eq!(queue.get(), 1);
		assert_eq!(queue.get(), 2);
	}

	#[test]
	fn test_iter_is_a_snapshot() {
		let queue = DataflowQueue::new();
		queue.push(1).push(2);

		let mut iter = queue.iter();
		queue.push(3);

		assert_eq!(iter.next(), Some(1));
		assert_eq!(iter.next(), Some(2));
		assert_eq!(iter.next(), None);
		assert_eq!(queue.len(), 3);
	}

	#[test]
	fn test_concurrent_producers_and_consumers_balance() {
		let queue = Arc::new(DataflowQueue::new());
		let mut consumers = Vec::new();

		for _ in 0..4 {
			let queue = queue.clone();
			consumers.push(thread::spawn(move || {
				let mut taken = Vec::new();
				for _ in 0..25 {
					taken.push(queue.get());
				}
				taken
			}));
		}

		for chunk in 0..4 {
			let queue = queue.clone();
			thread::spawn(move || {
				for i in 0..25 {
					queue.push(chunk * 25 + i);
				}
			});
		}

		let mut all: Vec<i32> = consumers
			.into_iter()
			.flat_map(|consumer| consumer.join().expect("consumer"))
			.collect();
		all.sort_unstable();
		let expected: Vec<i32> = (0..100).collect();
		assert_eq!(all, expected);
		assert!(queue.is_empty());
	}
}
