// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Messages, envelopes and message sinks.
//!
//! Actors exchange dynamically typed payloads: anything implementing
//! [`Message`] can be sent, and handlers downcast to the concrete types
//! they understand. A [`MessageSink`] is anywhere an envelope can be
//! delivered — an actor, or the one-shot reply slot used by
//! send-and-wait.

use std::{any::Any, fmt, sync::Arc, time::Duration};

use crossbeam_channel::{RecvTimeoutError, bounded};
use weft_core::{Error, Result, diagnostic::actor::no_reply, err};

/// A value that can travel through a mailbox.
///
/// The `on_delivery_error` hook is invoked when the payload could not be
/// consumed: on refused sends to a stopped actor and for every envelope
/// drained from the mailbox of a terminating actor.
pub trait Message: Any + Send {
	/// Called when this payload will never be delivered.
	fn on_delivery_error(&self) {}
}

/// A boxed message payload.
pub type Payload = Box<dyn Message>;

impl fmt::Debug for dyn Message {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("<message>")
	}
}

impl dyn Message {
	/// Checks whether the payload is a `T`.
	pub fn is<T: Message>(&self) -> bool {
		let any: &dyn Any = self;
		any.is::<T>()
	}

	/// Borrows the payload as a `T`, if it is one.
	pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
		let any: &dyn Any = self;
		any.downcast_ref::<T>()
	}

	/// Takes the payload as a `T`, handing it back on mismatch.
	pub fn downcast<T: Message>(self: Box<Self>) -> std::result::Result<Box<T>, Payload> {
		if self.is::<T>() {
			let any: Box<dyn Any> = self;
			Ok(any.downcast::<T>().expect("type id checked before downcast"))
		} else {
			Err(self)
		}
	}
}

macro_rules! impl_message {
	($($ty:ty),* $(,)?) => {
		$(impl Message for $ty {})*
	};
}

impl_message!(
	(),
	bool,
	char,
	i8,
	i16,
	i32,
	i64,
	i128,
	isize,
	u8,
	u16,
	u32,
	u64,
	u128,
	usize,
	f32,
	f64,
	String,
	&'static str,
	Duration,
);

impl<T: Send + 'static> Message for Vec<T> {}
impl<T: Send + 'static> Message for Option<T> {}

// Errors travel as ordinary payloads so a reply can carry a failure;
// send-and-wait rethrows them on the caller's side.
impl Message for Error {}

/// A message with an attached sender, as stored in mailboxes.
pub struct Envelope {
	pub payload: Payload,
	pub sender: Option<Recipient>,
}

impl Envelope {
	/// Wraps a payload without a sender.
	pub fn new(payload: impl Message) -> Self {
		Self {
			payload: Box::new(payload),
			sender: None,
		}
	}
}

/// Anywhere an envelope can be delivered.
pub trait MessageSink: Send + Sync {
	/// Delivers an envelope to this sink.
	fn accept(&self, env: Envelope) -> Result<()>;
}

/// A shareable reference to a message sink.
pub type Recipient = Arc<dyn MessageSink>;

/// One-shot reply slot backing send-and-wait.
///
/// The first reply wins; later replies are dropped silently, mirroring a
/// reply sent to an actor that has already moved on.
pub(crate) struct OneShotSink {
	tx: crossbeam_channel::Sender<Payload>,
}

impl MessageSink for OneShotSink {
	fn accept(&self, env: Envelope) -> Result<()> {
		let _ = self.tx.try_send(env.payload);
		Ok(())
	}
}

/// Sends a message through `deliver` and waits for the single reply.
///
/// Returns `Ok(None)` when `timeout` elapses first. A reply payload that
/// is an [`Error`] is rethrown on this side.
pub(crate) fn send_and_wait_via(
	actor: &str,
	payload: Payload,
	timeout: Option<Duration>,
	deliver: impl FnOnce(Envelope) -> Result<()>,
) -> Result<Option<Payload>> {
	let (tx, rx) = bounded(1);
	let sink: Recipient = Arc::new(OneShotSink {
		tx,
	});

	deliver(Envelope {
		payload,
		sender: Some(sink),
	})?;

	let reply = match timeout {
		None => match rx.recv() {
			Ok(payload) => payload,
			Err(_) => return err!(no_reply(actor)),
		},
		Some(timeout) => match rx.recv_timeout(timeout) {
			Ok(payload) => payload,
			Err(RecvTimeoutError::Timeout) => return Ok(None),
			Err(RecvTimeoutError::Disconnected) => return err!(no_reply(actor)),
		},
	};

	if reply.is::<Error>() {
		let error = reply.downcast::<Error>().expect("type checked above");
		return Err(*error);
	}
	Ok(Some(reply))
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, Ordering};

	use super::*;

	struct Tagged(&'static str);
	impl Message for Tagged {}

	#[test]
	fn test_downcast_ref() {
		let payload: Payload = Box::new(Tagged("hello"));

		assert!(payload.is::<Tagged>());
		assert_eq!(payload.downcast_ref::<Tagged>().map(|t| t.0), Some("hello"));
		assert!(payload.downcast_ref::<i32>().is_none());
	}

	#[test]
	fn test_downcast_returns_payload_on_mismatch() {
		let payload: Payload = Box::new(41i32);

		let payload = payload.downcast::<String>().expect_err("mismatched downcast must fail");
		assert_eq!(*payload.downcast::<i32>().expect("i32 payload"), 41);
	}

	#[test]
	fn test_one_shot_sink_keeps_first_reply() {
		let (tx, rx) = bounded(1);
		let sink = OneShotSink {
			tx,
		};

		sink.accept(Envelope::new(1i32)).expect("first accept");
		sink.accept(Envelope::new(2i32)).expect("second accept is dropped");

		let first = rx.recv().expect("one payload");
		assert_eq!(*first.downcast::<i32>().expect("i32"), 1);
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn test_send_and_wait_rethrows_error_reply() {
		static DELIVERED: AtomicBool = AtomicBool::new(false);

		let result = send_and_wait_via("test", Box::new("ping"), None, |env| {
			DELIVERED.store(true, Ordering::SeqCst);
			let sender = env.sender.expect("sink attached");
			sender.accept(Envelope::new(weft_core::error!(
				weft_core::diagnostic::dataflow::already_bound()
			)))
		});

		assert!(DELIVERED.load(Ordering::SeqCst));
		assert_eq!(result.expect_err("error reply rethrown").code(), "FLOW_001");
	}

	#[test]
	fn test_send_and_wait_times_out() {
		let result = send_and_wait_via("test", Box::new("ping"), Some(Duration::from_millis(5)), |_env| Ok(()));

		assert!(result.expect("timeout is not an error").is_none());
	}
}
