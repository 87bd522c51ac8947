// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Blocking-style actor adapter.
//!
//! The same public contract as the continuation actor — send, reply,
//! stop, join, send-and-wait — implemented as one long-running pool task
//! that takes messages off a channel with a blocking `receive`. The
//! adapter occupies a worker thread for its whole lifetime; it exists
//! for bodies that read more naturally as straight-line code.
//!
//! Shutdown follows the timed-receive idiom: every blocking wait wakes
//! at a short interval to check the cancellation token, so `stop()` is
//! observed promptly without thread interruption.

use std::{
	panic::{AssertUnwindSafe, catch_unwind},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use tracing::debug;
use weft_core::{
	Error, Result,
	diagnostic::actor::{already_started, delivery_refused, interrupted, no_sender, not_started, replies_disabled, user_panic},
};
use weft_runtime::{CancellationToken, Latch};

use crate::{
	group::ActorGroup,
	hooks::{self, Hooks, run_hook},
	local::{self, CurrentActorGuard},
	mailbox::RunState,
	message::{self, Envelope, Message, MessageSink, Payload, Recipient},
};

/// Interval for checking cancellation during blocked receive.
const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// The body of a blocking actor.
pub type BlockingBody = Box<dyn FnOnce(&mut BlockingScope) -> Result<()> + Send>;

pub(crate) struct BlockingCore {
	name: String,
	group: ActorGroup,
	tx: Sender<Envelope>,
	rx: Mutex<Option<Receiver<Envelope>>>,
	state: Mutex<RunState>,
	cancel: CancellationToken,
	send_replies: Arc<AtomicBool>,
	hooks: Mutex<Hooks>,
	body: Mutex<Option<BlockingBody>>,
	done: Latch,
}

impl BlockingCore {
	fn deliver(&self, env: Envelope) -> Result<()> {
		let state = self.state.lock();
		match *state {
			RunState::Fresh => weft_core::err!(not_started("send")),
			RunState::Stopped => {
				drop(state);
				env.payload.on_delivery_error();
				weft_core::err!(delivery_refused(&self.name))
			}
			_ => {
				if self.cancel.is_cancelled() {
					drop(state);
					env.payload.on_delivery_error();
					return weft_core::err!(delivery_refused(&self.name));
				}
				// The send happens under the state lock so no message
				// can slip in between stop marking and the final drain.
				match self.tx.send(env) {
					Ok(()) => Ok(()),
					Err(send_error) => {
						drop(state);
						send_error.0.payload.on_delivery_error();
						weft_core::err!(delivery_refused(&self.name))
					}
				}
			}
		}
	}
}

impl MessageSink for BlockingCore {
	fn accept(&self, env: Envelope) -> Result<()> {
		self.deliver(env)
	}
}

fn run_blocking(core: Arc<BlockingCore>, body: BlockingBody) {
	let recipient: Recipient = core.clone();
	let _guard = CurrentActorGuard::enter(recipient, core.send_replies.clone());

	let after_start = core.hooks.lock().after_start.take();
	if let Some(hook) = after_start {
		run_hook(&core.name, "after_start", hook);
	}

	let rx = core.rx.lock().take().expect("blocking actor body started twice");
	let mut scope = BlockingScope {
		core: core.clone(),
		rx,
		sender: None,
	};

	let outcome = catch_unwind(AssertUnwindSafe(|| body(&mut scope)));

	let (on_exception, on_interrupt, before_stop, after_stop) = {
		let mut hooks = core.hooks.lock();
		(hooks.on_exception.take(), hooks.on_interrupt.take(), hooks.before_stop.take(), hooks.after_stop.take())
	};

	match outcome {
		Ok(Ok(())) => {}
		Ok(Err(error)) if error.code() == "ACTOR_006" => {
			if let Some(hook) = on_interrupt {
				run_hook(&core.name, "on_interrupt", hook);
			}
		}
		Ok(Err(error)) => report_failure(&core, on_exception, error),
		Err(payload) => {
			let detail = hooks::panic_detail(payload.as_ref());
			report_failure(&core, on_exception, weft_core::error!(user_panic(&detail)));
		}
	}

	if let Some(hook) = before_stop {
		run_hook(&core.name, "before_stop", hook);
	}

	{
		*core.state.lock() = RunState::Stopped;
	}
	core.cancel.cancel();

	let drained: Vec<Envelope> = scope.rx.try_iter().collect();
	for env in &drained {
		env.payload.on_delivery_error();
	}
	match after_stop {
		Some(hook) => run_hook(&core.name, "after_stop", move || hook(drained)),
		None => drop(drained),
	}

	debug!(actor = %core.name, "blocking actor stopped");
	core.done.open();
}

fn report_failure(core: &Arc<BlockingCore>, on_exception: Option<crate::hooks::ExceptionHook>, error: Error) {
	match on_exception {
		Some(hook) => run_hook(&core.name, "on_exception", move || hook(&error)),
		None => tracing::error!(
			thread = %hooks::current_thread_name(),
			actor = %core.name,
			%error,
			"unhandled error in blocking actor body"
		),
	}
}

/// Builds a blocking actor with optional lifecycle hooks.
pub struct BlockingActorBuilder {
	name: Option<String>,
	body: BlockingBody,
	hooks: Hooks,
}

impl BlockingActorBuilder {
	pub fn new(body: impl FnOnce(&mut BlockingScope) -> Result<()> + Send + 'static) -> Self {
		Self {
			name: None,
			body: Box::new(body),
			hooks: Hooks::default(),
		}
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn after_start(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
		self.hooks.after_start = Some(Box::new(hook));
		self
	}

	pub fn before_stop(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
		self.hooks.before_stop = Some(Box::new(hook));
		self
	}

	pub fn after_stop(mut self, hook: impl FnOnce(Vec<Envelope>) + Send + 'static) -> Self {
		self.hooks.after_stop = Some(Box::new(hook));
		self
	}

	pub fn on_exception(mut self, hook: impl FnOnce(&Error) + Send + 'static) -> Self {
		self.hooks.on_exception = Some(Box::new(hook));
		self
	}

	/// Runs when a blocking receive is interrupted by `stop()`.
	pub fn on_interrupt(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
		self.hooks.on_interrupt = Some(Box::new(hook));
		self
	}

	/// Builds the actor without starting it.
	pub fn build(self, group: &ActorGroup) -> BlockingActorHandle {
		static BLOCKING_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
		let name = self
			.name
			.unwrap_or_else(|| format!("blocking-actor-{}", BLOCKING_COUNTER.fetch_add(1, Ordering::Relaxed)));
		let (tx, rx) = unbounded();
		let body = self.body;
		let hooks = self.hooks;
		let group = group.clone();

		let core = Arc::new(BlockingCore {
			name,
			group,
			tx,
			rx: Mutex::new(Some(rx)),
			state: Mutex::new(RunState::Fresh),
			cancel: CancellationToken::new(),
			send_replies: Arc::new(AtomicBool::new(true)),
			hooks: Mutex::new(hooks),
			body: Mutex::new(Some(body)),
			done: Latch::new(),
		});

		BlockingActorHandle {
			core,
		}
	}

	/// Builds and immediately starts the actor.
	pub fn spawn(self, group: &ActorGroup) -> Result<BlockingActorHandle> {
		let handle = self.build(group);
		handle.start()?;
		Ok(handle)
	}
}

/// Shareable handle to a blocking actor.
#[derive(Clone)]
pub struct BlockingActorHandle {
	core: Arc<BlockingCore>,
}

impl BlockingActorHandle {
	pub fn name(&self) -> &str {
		&self.core.name
	}

	/// Starts the actor: its body occupies one pool worker until it
	/// returns. Actors are one-shot, like their pooled counterpart.
	pub fn start(&self) -> Result<()> {
		{
			let mut state = self.core.state.lock();
			if *state != RunState::Fresh {
				return weft_core::err!(already_started());
			}
			*state = RunState::Running;
		}
		let body = self.core.body.lock().take().expect("fresh actor holds its body");
		let core = self.core.clone();
		self.core.group.pool().execute(Box::new(move || run_blocking(core, body)));
		Ok(())
	}

	/// Sends a message, capturing the current actor (if any) as sender.
	pub fn send(&self, msg: impl Message) -> Result<()> {
		self.core.deliver(Envelope {
			payload: Box::new(msg),
			sender: local::capture_sender(),
		})
	}

	/// Sends a message and blocks until the one reply arrives.
	pub fn send_and_wait(&self, msg: impl Message) -> Result<Payload> {
		let reply = message::send_and_wait_via(&self.core.name, Box::new(msg), None, |env| self.core.deliver(env))?;
		Ok(reply.expect("untimed wait always yields a reply"))
	}

	/// Like [`send_and_wait`](Self::send_and_wait) with a timeout;
	/// `Ok(None)` when it elapses.
	pub fn send_and_wait_for(&self, msg: impl Message, timeout: Duration) -> Result<Option<Payload>> {
		message::send_and_wait_via(&self.core.name, Box::new(msg), Some(timeout), |env| self.core.deliver(env))
	}

	/// Requests termination; a blocked receive observes it within the
	/// shutdown check interval.
	pub fn stop(&self) {
		let mut state = self.core.state.lock();
		match *state {
			RunState::Stopped => {}
			RunState::Fresh => {
				*state = RunState::Stopped;
				drop(state);
				self.core.done.open();
			}
			_ => {
				drop(state);
				self.core.cancel.cancel();
			}
		}
	}

	/// Blocks until the actor has terminated.
	pub fn join(&self) {
		self.core.done.wait();
	}

	/// Blocks until termination or timeout; `true` if it terminated.
	pub fn join_for(&self, timeout: Duration) -> bool {
		self.core.done.wait_for(timeout)
	}

	/// Whether the actor has been started and not yet stopped.
	pub fn is_active(&self) -> bool {
		*self.core.state.lock() == RunState::Running && !self.core.cancel.is_cancelled()
	}
}

impl MessageSink for BlockingActorHandle {
	fn accept(&self, env: Envelope) -> Result<()> {
		self.core.deliver(env)
	}
}

/// In-body view of a blocking actor.
pub struct BlockingScope {
	core: Arc<BlockingCore>,
	rx: Receiver<Envelope>,
	sender: Option<Recipient>,
}

impl BlockingScope {
	pub fn name(&self) -> &str {
		&self.core.name
	}

	/// Takes the next message, blocking until one arrives.
	///
	/// Fails with `ACTOR_006` when `stop()` interrupts the wait.
	pub fn receive(&mut self) -> Result<Payload> {
		loop {
			if self.core.cancel.is_cancelled() {
				return weft_core::err!(interrupted(&self.core.name));
			}
			match self.rx.recv_timeout(SHUTDOWN_CHECK_INTERVAL) {
				Ok(env) => {
					let Envelope {
						payload,
						sender,
					} = env;
					self.sender = sender;
					return Ok(payload);
				}
				Err(RecvTimeoutError::Timeout) => continue,
				Err(RecvTimeoutError::Disconnected) => {
					return weft_core::err!(interrupted(&self.core.name));
				}
			}
		}
	}

	/// Takes the next message or returns `None` after `timeout`.
	pub fn receive_timeout(&mut self, timeout: Duration) -> Result<Option<Payload>> {
		let deadline = Instant::now() + timeout;
		loop {
			if self.core.cancel.is_cancelled() {
				return weft_core::err!(interrupted(&self.core.name));
			}
			let now = Instant::now();
			if now >= deadline {
				return Ok(None);
			}
			let wait = SHUTDOWN_CHECK_INTERVAL.min(deadline - now);
			match self.rx.recv_timeout(wait) {
				Ok(env) => {
					let Envelope {
						payload,
						sender,
					} = env;
					self.sender = sender;
					return Ok(Some(payload));
				}
				Err(RecvTimeoutError::Timeout) => continue,
				Err(RecvTimeoutError::Disconnected) => {
					return weft_core::err!(interrupted(&self.core.name));
				}
			}
		}
	}

	/// The reply target of the message last received.
	pub fn sender(&self) -> Option<Recipient> {
		self.sender.clone()
	}

	/// Replies to the sender of the last received message.
	pub fn reply(&self, msg: impl Message) -> Result<()> {
		if !self.core.send_replies.load(Ordering::SeqCst) {
			return weft_core::err!(replies_disabled());
		}
		match &self.sender {
			Some(target) => target.accept(Envelope {
				payload: Box::new(msg),
				sender: local::capture_sender(),
			}),
			None => weft_core::err!(no_sender()),
		}
	}

	/// Replies if the last message has a sender; `false` otherwise.
	pub fn reply_if_exists(&self, msg: impl Message) -> bool {
		if !self.core.send_replies.load(Ordering::SeqCst) {
			return false;
		}
		match &self.sender {
			Some(target) => target
				.accept(Envelope {
					payload: Box::new(msg),
					sender: local::capture_sender(),
				})
				.is_ok(),
			None => false,
		}
	}

	/// A handle to this actor itself.
	pub fn handle(&self) -> BlockingActorHandle {
		BlockingActorHandle {
			core: self.core.clone(),
		}
	}

	pub fn enable_sending_replies(&self) {
		self.core.send_replies.store(true, Ordering::SeqCst);
	}

	pub fn disable_sending_replies(&self) {
		self.core.send_replies.store(false, Ordering::SeqCst);
	}
}
