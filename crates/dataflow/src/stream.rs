// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Deterministic multi-reader dataflow stream.
//!
//! A stream is a functional cons-list: every cell owns a write-once
//! `first` slot and a lazily created `rest` cell. Readers keep their own
//! cursor, so consuming a value never hides it from other readers, and
//! all readers observe the same binding order. The end of a stream is
//! the cell whose `first` is bound to `None`.
//!
//! Each cell has a single producer; concurrent writers must serialize
//! externally or go through a [`StreamWriteAdapter`](crate::adapter::StreamWriteAdapter).
//! The transformation methods traverse the stream on the calling
//! thread, blocking on unbound cells until the end-of-stream marker, and
//! are written as loops so long streams cannot grow the stack.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use weft_core::Result;

use crate::channel::ReadChannel;

type Listener<T> = Arc<dyn Fn(&Option<T>) + Send + Sync>;

/// One cell of a stream; also the handle for its whole tail.
pub struct DataflowStream<T> {
	first: crate::variable::DataflowVariable<Option<T>>,
	rest: OnceCell<Arc<DataflowStream<T>>>,
	/// Shared by every cell of the stream; fired on each bind,
	/// including the end-of-stream marker.
	listeners: Arc<RwLock<Vec<Listener<T>>>>,
}

impl<T> std::fmt::Debug for DataflowStream<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DataflowStream").finish_non_exhaustive()
	}
}

impl<T: Send + Clone + 'static> DataflowStream<T> {
	/// Creates an empty stream.
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			first: crate::variable::DataflowVariable::new(),
			rest: OnceCell::new(),
			listeners: Arc::new(RwLock::new(Vec::new())),
		})
	}

	fn with_listeners(listeners: Arc<RwLock<Vec<Listener<T>>>>) -> Arc<Self> {
		let cell = Arc::new(Self {
			first: crate::variable::DataflowVariable::new(),
			rest: OnceCell::new(),
			listeners: listeners.clone(),
		});
		for listener in listeners.read().iter() {
			let listener = listener.clone();
			cell.first.when_bound(move |value| listener(&value));
		}
		cell
	}

	/// Binds one value into this cell and returns the rest of the
	/// stream, creating it on demand.
	pub fn push(&self, value: T) -> Result<Arc<Self>> {
		self.first.bind(Some(value))?;
		Ok(self.rest())
	}

	/// Binds the end-of-stream marker into this cell.
	pub fn close(&self) -> Result<()> {
		self.first.bind(None)
	}

	/// Binds the next value of `source` into this cell; returns the
	/// rest immediately.
	pub fn push_channel(self: &Arc<Self>, source: &dyn ReadChannel<T>) -> Arc<Self> {
		let cell = self.clone();
		source.read_async(Box::new(move |value| {
			let _ = cell.first.bind(Some(value));
		}));
		self.rest()
	}

	/// The value of this cell, blocking until bound.
	///
	/// `None` is the end-of-stream marker.
	pub fn first(&self) -> Option<T> {
		self.first.get()
	}

	/// The value of this cell, or `None` (outer) once `timeout` elapses.
	pub fn first_timeout(&self, timeout: std::time::Duration) -> Option<Option<T>> {
		self.first.get_timeout(timeout)
	}

	/// Whether this cell's value is there yet.
	pub fn is_first_bound(&self) -> bool {
		self.first.is_bound()
	}

	/// Runs `callback` with this cell's value once bound.
	pub fn when_first_bound(&self, callback: impl FnOnce(Option<T>) + Send + 'static) {
		self.first.when_bound(callback);
	}

	/// The remainder of the stream after this cell.
	pub fn rest(&self) -> Arc<Self> {
		self.rest.get_or_init(|| Self::with_listeners(self.listeners.clone())).clone()
	}

	/// Whether this cell is the end of the stream. Blocks until the
	/// cell's value is bound.
	pub fn is_empty(&self) -> bool {
		self.first().is_none()
	}

	/// Fires `listener` for every value bound into this stream from
	/// this cell onward.
	pub fn whenever_bound(&self, listener: impl Fn(&Option<T>) + Send + Sync + 'static) {
		let listener: Listener<T> = Arc::new(listener);
		self.listeners.write().push(listener.clone());
		self.first.when_bound(move |value| listener(&value));
	}

	/// Fills the stream from a seed: while `condition` holds, the seed
	/// is appended and `generator` derives the next value; then the
	/// stream is closed.
	pub fn generate(
		self: &Arc<Self>,
		seed: T,
		generator: impl Fn(&T) -> T,
		condition: impl Fn(&T) -> bool,
	) -> Result<()> {
		let mut value = seed;
		let mut cursor = self.clone();
		loop {
			if !condition(&value) {
				return cursor.close();
			}
			let next = generator(&value);
			cursor = cursor.push(value)?;
			value = next;
		}
	}

	/// A new stream holding the values that satisfy `predicate`.
	///
	/// Traverses this stream until end-of-stream, blocking as needed.
	pub fn filter(self: &Arc<Self>, predicate: impl Fn(&T) -> bool) -> Result<Arc<Self>> {
		let result = Self::new();
		let mut cursor = self.clone();
		let mut out = result.clone();
		loop {
			match cursor.first() {
				None => {
					out.close()?;
					return Ok(result);
				}
				Some(value) => {
					if predicate(&value) {
						out = out.push(value)?;
					}
					cursor = cursor.rest();
				}
			}
		}
	}

	/// A new stream holding `f` applied to every value.
	///
	/// Traverses this stream until end-of-stream, blocking as needed.
	pub fn map<U: Send + Clone + 'static>(self: &Arc<Self>, f: impl Fn(T) -> U) -> Result<Arc<DataflowStream<U>>> {
		let result = DataflowStream::new();
		let mut cursor = self.clone();
		let mut out = result.clone();
		loop {
			match cursor.first() {
				None => {
					out.close()?;
					return Ok(result);
				}
				Some(value) => {
					out = out.push(f(value))?;
					cursor = cursor.rest();
				}
			}
		}
	}

	/// Folds the whole stream into an accumulator seeded with `seed`.
	pub fn fold(self: &Arc<Self>, seed: T, f: impl Fn(T, T) -> T) -> T {
		let mut accumulator = seed;
		let mut cursor = self.clone();
		loop {
			match cursor.first() {
				None => return accumulator,
				Some(value) => {
					accumulator = f(accumulator, value);
					cursor = cursor.rest();
				}
			}
		}
	}

	/// Folds the whole stream, seeding with its first value.
	///
	/// Returns `None` for an empty stream.
	pub fn reduce(self: &Arc<Self>, f: impl Fn(T, T) -> T) -> Option<T> {
		let seed = self.first()?;
		Some(self.rest().fold(seed, f))
	}

	/// A blocking iterator over the values up to end-of-stream.
	pub fn iter(self: &Arc<Self>) -> StreamIter<T> {
		StreamIter {
			cursor: self.clone(),
		}
	}
}

/// Reader cursor walking a stream cell by cell.
pub struct StreamIter<T> {
	cursor: Arc<DataflowStream<T>>,
}

impl<T: Send + Clone + 'static> Iterator for StreamIter<T> {
	type Item = T;

	fn next(&mut self) -> Option<T> {
		let value = self.cursor.first()?;
		self.cursor = self.cursor.rest();
		Some(value)
	}
}
