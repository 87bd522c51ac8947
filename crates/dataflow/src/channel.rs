// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Channel traits wiring dataflow primitives into operators.

use std::time::Duration;

use weft_actor::Recipient;
use weft_core::Result;

/// A one-shot callback receiving the next value of a channel.
pub type ReadCallback<T> = Box<dyn FnOnce(T) + Send>;

/// The consuming side of a dataflow channel.
///
/// For a [`DataflowVariable`](crate::DataflowVariable) every read
/// observes the single bound value; for a queue each read consumes one
/// element.
pub trait ReadChannel<T: Send + Clone + 'static>: Send + Sync {
	/// Takes the next value, blocking until one is bound.
	fn read(&self) -> T;

	/// Takes the next value or returns `None` once `timeout` elapses.
	///
	/// A timed-out read leaves no waiter behind.
	fn read_timeout(&self, timeout: Duration) -> Option<T>;

	/// Registers a callback for the next value.
	///
	/// The callback runs on the thread that binds the value, or
	/// immediately on the calling thread when the value is already
	/// there.
	fn read_async(&self, callback: ReadCallback<T>);

	/// Delivers the next value to a message sink as a
	/// [`BoundValue`](crate::BoundValue) payload.
	fn read_into(&self, attachment: Option<usize>, sink: Recipient) {
		self.read_async(Box::new(move |value| {
			let _ = sink.accept(weft_actor::Envelope {
				payload: Box::new(crate::variable::BoundValue {
					attachment,
					value,
				}),
				sender: None,
			});
		}));
	}
}

/// The producing side of a dataflow channel.
pub trait WriteChannel<T: Send + Clone + 'static>: Send + Sync {
	/// Binds one value into the channel.
	///
	/// Fails for single-assignment channels that are already bound.
	fn write(&self, value: T) -> Result<()>;
}
