// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! One-shot completion gate.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A latch that starts closed and can be opened exactly once.
///
/// Used for actor joins and other completion waits. Opening an already
/// open latch is a no-op.
pub struct Latch {
	open: Mutex<bool>,
	cond: Condvar,
}

impl Latch {
	/// Creates a closed latch.
	pub fn new() -> Self {
		Self {
			open: Mutex::new(false),
			cond: Condvar::new(),
		}
	}

	/// Opens the latch, waking all waiters.
	pub fn open(&self) {
		let mut open = self.open.lock();
		*open = true;
		self.cond.notify_all();
	}

	/// Returns whether the latch has been opened.
	pub fn is_open(&self) -> bool {
		*self.open.lock()
	}

	/// Blocks until the latch opens.
	pub fn wait(&self) {
		let mut open = self.open.lock();
		while !*open {
			self.cond.wait(&mut open);
		}
	}

	/// Blocks until the latch opens or the timeout elapses.
	///
	/// Returns `true` if the latch opened within the timeout.
	pub fn wait_for(&self, timeout: Duration) -> bool {
		let deadline = std::time::Instant::now() + timeout;
		let mut open = self.open.lock();
		while !*open {
			if self.cond.wait_until(&mut open, deadline).timed_out() {
				return *open;
			}
		}
		true
	}
}

impl Default for Latch {
	fn default() -> Self {
		Self::new()
	}
}
