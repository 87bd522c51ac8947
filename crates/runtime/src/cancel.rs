// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Cooperative cancellation.

use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

/// A cancellation token for signalling shutdown.
///
/// Cloned tokens share the same flag. There is no way to interrupt a
/// running task; holders are expected to poll the token at their own
/// safe points (between chunks, between timed waits).
#[derive(Clone)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	/// Creates a new, uncancelled token.
	pub fn new() -> Self {
		Self {
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Signals cancellation.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	/// Checks whether cancellation was requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cancel_is_visible_through_clones() {
		let token = CancellationToken::new();
		let clone = token.clone();

		assert!(!clone.is_cancelled());
		token.cancel();
		assert!(clone.is_cancelled());
	}
}
