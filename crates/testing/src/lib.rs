// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Polling helpers for concurrency tests.
//!
//! Assertions on concurrent state should poll for the expected outcome
//! instead of sleeping a fixed amount: polling keeps fast machines fast
//! and slow machines green.

use std::thread;
use std::time::{Duration, Instant};

/// How long [`wait_for`] polls before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// How often [`wait_for`] re-checks its condition.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls `condition` until it holds.
///
/// # Panics
/// Panics with `timeout_message` when the condition is still false after
/// `timeout`.
pub fn wait_for_condition<F>(condition: F, timeout: Duration, poll_interval: Duration, timeout_message: &str)
where
	F: Fn() -> bool,
{
	let start = Instant::now();

	while !condition() {
		if start.elapsed() > timeout {
			panic!("Timeout after {:?}: {}", timeout, timeout_message);
		}
		thread::sleep(poll_interval);
	}
}

/// [`wait_for_condition`] with the default timeout and poll interval.
pub fn wait_for<F>(condition: F, message: &str)
where
	F: Fn() -> bool,
{
	wait_for_condition(condition, DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL, message);
}

/// Polls `produce` until it yields a value, and returns it.
///
/// Useful when the assertion needs the observed value, not just the
/// fact that it appeared.
///
/// # Panics
/// Panics with `message` when nothing is produced within the default
/// timeout.
pub fn wait_for_value<T, F>(produce: F, message: &str) -> T
where
	F: Fn() -> Option<T>,
{
	let start = Instant::now();

	loop {
		if let Some(value) = produce() {
			return value;
		}
		if start.elapsed() > DEFAULT_TIMEOUT {
			panic!("Timeout after {:?}: {}", DEFAULT_TIMEOUT, message);
		}
		thread::sleep(DEFAULT_POLL_INTERVAL);
	}
}
