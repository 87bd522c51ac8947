// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Mailbox state machine.
//!
//! One mutex guards the whole per-actor scheduling state: the FIFO of
//! undelivered envelopes, the pending react handler, the run state, the
//! stop flag and the armed react timer. Every transition happens under
//! that lock so that exactly one of "adopt-and-schedule" or "enqueue"
//! occurs per send, and so that a react timeout and a racing message
//! resolve to exactly one winner.

use std::collections::VecDeque;

use weft_runtime::TimerHandle;

use crate::{message::Envelope, pooled::ReactHandler};

/// Lifecycle of the actor as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
	/// Built but not started.
	Fresh,
	/// A chunk is queued or executing.
	Running,
	/// Parked on react; no chunk in flight, no thread held.
	Suspended,
	/// Terminated; no further chunk will run.
	Stopped,
}

/// Scheduling state of one actor, kept under a single lock.
pub(crate) struct Mailbox {
	pub queue: VecDeque<Envelope>,
	pub pending: Option<ReactHandler>,
	pub run_state: RunState,
	pub stop_requested: bool,
	/// Bumped whenever the pending handler is installed or taken; lets a
	/// fired timer recognize that its react round is already over.
	pub generation: u64,
	pub timer: Option<TimerHandle>,
}

/// What a send must do after releasing the mailbox lock.
pub(crate) enum SendTransition {
	/// The pending handler adopted the message: schedule a chunk binding
	/// the two, and cancel the returned react timer if one was armed.
	Adopted {
		handler: ReactHandler,
		env: Envelope,
		timer: Option<TimerHandle>,
	},
	/// No handler was pending: the envelope joined the queue.
	Enqueued,
	/// The actor has stopped (or is stopping); the payload must see its
	/// delivery-error hook.
	Refused(Envelope),
	/// The actor was never started.
	NotStarted(Envelope),
}

impl Mailbox {
	pub fn new() -> Self {
		Self {
			queue: VecDeque::new(),
			pending: None,
			run_state: RunState::Fresh,
			stop_requested: false,
			generation: 0,
			timer: None,
		}
	}

	/// The atomic adopt-vs-enqueue decision.
	pub fn on_send(&mut self, env: Envelope) -> SendTransition {
		if self.run_state == RunState::Stopped || self.stop_requested {
			return SendTransition::Refused(env);
		}
		if self.run_state == RunState::Fresh {
			return SendTransition::NotStarted(env);
		}
		match self.pending.take() {
			Some(handler) => {
				self.generation += 1;
				self.run_state = RunState::Running;
				SendTransition::Adopted {
					handler,
					env,
					timer: self.timer.take(),
				}
			}
			None => {
				self.queue.push_back(env);
				SendTransition::Enqueued
			}
		}
	}

	/// Claims the pending handler for a fired react timeout.
	///
	/// Returns `true` when the timeout won the race: the handler of that
	/// react round was still pending and is discarded. A stale
	/// generation means a message (or stop) got there first.
	pub fn claim_timeout(&mut self, generation: u64) -> bool {
		if self.run_state != RunState::Suspended || self.generation != generation {
			return false;
		}
		if self.pending.take().is_none() {
			return false;
		}
		self.generation += 1;
		self.timer = None;
		self.run_state = RunState::Running;
		true
	}

	/// Marks the actor stopped and empties the queue for draining.
	pub fn drain(&mut self) -> Vec<Envelope> {
		self.run_state = RunState::Stopped;
		self.stop_requested = true;
		if let Some(timer) = self.timer.take() {
			timer.cancel();
		}
		self.queue.drain(..).collect()
	}
}
