// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Thread-local current-actor binding.
//!
//! While a chunk (or a blocking actor's body) runs, the worker thread
//! carries a reference to the owning actor so that `send` can capture the
//! sender automatically. The slot is restored on every chunk exit; code
//! running outside the runtime sees an empty slot and sends without a
//! sender.

use std::{
	cell::RefCell,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use crate::message::Recipient;

struct CurrentActor {
	recipient: Recipient,
	send_replies: Arc<AtomicBool>,
}

thread_local! {
	static CURRENT: RefCell<Option<CurrentActor>> = const { RefCell::new(None) };
}

/// Binds the current thread to an actor for the duration of the guard.
pub(crate) struct CurrentActorGuard {
	previous: Option<CurrentActor>,
}

impl CurrentActorGuard {
	pub(crate) fn enter(recipient: Recipient, send_replies: Arc<AtomicBool>) -> Self {
		let previous = CURRENT.with(|slot| {
			slot.borrow_mut().replace(CurrentActor {
				recipient,
				send_replies,
			})
		});
		Self {
			previous,
		}
	}
}

impl Drop for CurrentActorGuard {
	fn drop(&mut self) {
		CURRENT.with(|slot| {
			*slot.borrow_mut() = self.previous.take();
		});
	}
}

/// The sender to attach to an outgoing message, if any.
///
/// Returns the current actor when the thread runs inside one and that
/// actor has sending replies enabled.
pub(crate) fn capture_sender() -> Option<Recipient> {
	CURRENT.with(|slot| {
		slot.borrow()
			.as_ref()
			.filter(|current| current.send_replies.load(Ordering::SeqCst))
			.map(|current| current.recipient.clone())
	})
}

#[cfg(test)]
mod tests {
	use weft_core::Result;

	use super::*;
	use crate::message::{Envelope, MessageSink};

	struct NullSink;
	impl MessageSink for NullSink {
		fn accept(&self, _env: Envelope) -> Result<()> {
			Ok(())
		}
	}

	#[test]
	fn test_empty_outside_actor() {
		assert!(capture_sender().is_none());
	}

	#[test]
	fn test_guard_sets_and_restores() {
		let flag = Arc::new(AtomicBool::new(true));
		{
			let _guard = CurrentActorGuard::enter(Arc::new(NullSink), flag.clone());
			assert!(capture_sender().is_some());
		}
		assert!(capture_sender().is_none());
	}

	#[test]
	fn test_disabled_replies_suppress_capture() {
		let flag = Arc::new(AtomicBool::new(false));
		let _guard = CurrentActorGuard::enter(Arc::new(NullSink), flag.clone());

		assert!(capture_sender().is_none());
		flag.store(true, Ordering::SeqCst);
		assert!(capture_sender().is_some());
	}
}
