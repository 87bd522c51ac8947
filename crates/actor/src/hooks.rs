// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Optional lifecycle callbacks.
//!
//! Hooks are supplied at construction and fire at most once. They run on
//! the worker thread, inside the actor's thread-local binding, with no
//! internal lock held. A hook that fails is reported to the diagnostic
//! sink and never unwinds into the pool.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::error;
use weft_core::Error;

use crate::message::Envelope;

pub(crate) type LifecycleHook = Box<dyn FnOnce() + Send>;
pub(crate) type DrainHook = Box<dyn FnOnce(Vec<Envelope>) + Send>;
pub(crate) type ExceptionHook = Box<dyn FnOnce(&Error) + Send>;

/// The optional callback record of one actor.
#[derive(Default)]
pub(crate) struct Hooks {
	pub after_start: Option<LifecycleHook>,
	pub before_stop: Option<LifecycleHook>,
	pub after_stop: Option<DrainHook>,
	pub on_timeout: Option<LifecycleHook>,
	pub on_exception: Option<ExceptionHook>,
	pub on_interrupt: Option<LifecycleHook>,
}

/// Runs a hook, containing panics.
pub(crate) fn run_hook(actor: &str, hook_name: &str, hook: impl FnOnce()) {
	if let Err(payload) = catch_unwind(AssertUnwindSafe(hook)) {
		let detail = panic_detail(payload.as_ref());
		error!(
			thread = %current_thread_name(),
			actor = %actor,
			hook = %hook_name,
			detail = %detail,
			"lifecycle hook panicked"
		);
	}
}

pub(crate) fn current_thread_name() -> String {
	std::thread::current().name().unwrap_or("<unnamed>").to_string()
}

pub(crate) fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}
