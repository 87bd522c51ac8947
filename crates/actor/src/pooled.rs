// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! The continuation-style actor.
//!
//! An actor body runs as chunks: pool tasks that end by returning a
//! [`Reaction`]. `Reaction::React` suspends the actor until the next
//! message without holding a thread; `Reaction::ReactWithin` additionally
//! arms a timeout on the shared timer; `Reaction::Done` terminates. The
//! mailbox lock makes the adopt-vs-enqueue decision atomic per send, and
//! a generation counter guarantees a react timeout and a racing message
//! have exactly one winner.

use std::{
	panic::{AssertUnwindSafe, catch_unwind},
	sync::{
		Arc, Weak,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, trace};
use weft_core::{
	Error, Result,
	diagnostic::actor::{already_started, delivery_refused, no_sender, not_started, replies_disabled, user_panic},
};
use weft_runtime::{Latch, timer};

use crate::{
	group::ActorGroup,
	hooks::{self, Hooks, run_hook},
	local::{self, CurrentActorGuard},
	mailbox::{Mailbox, RunState, SendTransition},
	message::{self, Envelope, Message, MessageSink, Payload, Recipient},
};

/// A continuation installed by `react`: runs when the next message (or
/// the timeout trigger) arrives.
pub type ReactHandler = Box<dyn FnOnce(&mut ActorScope, Payload) -> Result<Reaction> + Send>;

/// The first chunk of an actor.
pub type BodyFn = Box<dyn FnOnce(&mut ActorScope) -> Result<Reaction> + Send>;

/// What an actor chunk decided to do next.
pub enum Reaction {
	/// Suspend until the next message, then run the handler.
	React(ReactHandler),
	/// Suspend with a timeout; if no message arrives in time the actor
	/// unwinds through its on-timeout hook.
	ReactWithin(Duration, ReactHandler),
	/// Terminate the actor.
	Done,
}

/// Suspends until the next message and resumes with `handler`.
pub fn react(handler: impl FnOnce(&mut ActorScope, Payload) -> Result<Reaction> + Send + 'static) -> Reaction {
	Reaction::React(Box::new(handler))
}

/// Like [`react`], with a timeout on the shared timer.
///
/// A zero timeout takes the timeout path immediately when the mailbox is
/// empty at suspension time.
pub fn react_within(
	timeout: Duration,
	handler: impl FnOnce(&mut ActorScope, Payload) -> Result<Reaction> + Send + 'static,
) -> Reaction {
	Reaction::ReactWithin(timeout, Box::new(handler))
}

/// Why an actor is terminating.
enum Cause {
	/// `Done`, `stop()` or fall-through.
	Normal,
	/// A react timeout fired before a message arrived.
	Timeout,
	/// User code returned an error or panicked.
	Failure(Error),
}

/// What a chunk does when the pool runs it.
enum Trigger {
	Start(BodyFn),
	Message(ReactHandler, Envelope),
	Terminate(Cause),
}

pub(crate) struct ActorCore {
	name: String,
	group: ActorGroup,
	weak_self: Weak<ActorCore>,
	mailbox: Mutex<Mailbox>,
	body: Mutex<Option<BodyFn>>,
	hooks: Mutex<Hooks>,
	send_replies: Arc<AtomicBool>,
	done: Latch,
}

impl ActorCore {
	fn schedule(self: &Arc<Self>, trigger: Trigger) {
		let core = self.clone();
		self.group.pool().execute(Box::new(move || run_chunk(core, trigger)));
	}

	/// Delivers an envelope: either the pending handler adopts it and a
	/// chunk is scheduled, or it joins the queue.
	fn deliver(self: &Arc<Self>, env: Envelope) -> Result<()> {
		let transition = self.mailbox.lock().on_send(env);
		match transition {
			SendTransition::Adopted {
				handler,
				env,
				timer,
			} => {
				if let Some(timer) = timer {
					timer.cancel();
				}
				trace!(actor = %self.name, "pending handler adopted message");
				self.schedule(Trigger::Message(handler, env));
				Ok(())
			}
			SendTransition::Enqueued => Ok(()),
			SendTransition::Refused(env) => {
				env.payload.on_delivery_error();
				weft_core::err!(delivery_refused(&self.name))
			}
			SendTransition::NotStarted(_) => weft_core::err!(not_started("send")),
		}
	}
}

impl MessageSink for ActorCore {
	fn accept(&self, env: Envelope) -> Result<()> {
		match self.weak_self.upgrade() {
			Some(core) => core.deliver(env),
			None => weft_core::err!(delivery_refused(&self.name)),
		}
	}
}

fn run_chunk(core: Arc<ActorCore>, trigger: Trigger) {
	let recipient: Recipient = core.clone();
	let _guard = CurrentActorGuard::enter(recipient, core.send_replies.clone());

	match trigger {
		Trigger::Start(body) => {
			let after_start = core.hooks.lock().after_start.take();
			if let Some(hook) = after_start {
				run_hook(&core.name, "after_start", hook);
			}
			execute_user(&core, None, body);
		}
		Trigger::Message(handler, env) => {
			let Envelope {
				payload,
				sender,
			} = env;
			execute_user(&core, sender, Box::new(move |scope| handler(scope, payload)));
		}
		Trigger::Terminate(cause) => terminate(&core, cause),
	}
}

fn execute_user(core: &Arc<ActorCore>, sender: Option<Recipient>, chunk: BodyFn) {
	let mut scope = ActorScope {
		core: core.clone(),
		sender,
	};

	match catch_unwind(AssertUnwindSafe(|| chunk(&mut scope))) {
		Ok(Ok(Reaction::Done)) => terminate(core, Cause::Normal),
		Ok(Ok(Reaction::React(handler))) => suspend(core, handler, None),
		Ok(Ok(Reaction::ReactWithin(timeout, handler))) => suspend(core, handler, Some(timeout)),
		Ok(Err(error)) => terminate(core, Cause::Failure(error)),
		Err(payload) => {
			let detail = hooks::panic_detail(payload.as_ref());
			terminate(core, Cause::Failure(weft_core::error!(user_panic(&detail))));
		}
	}
}

/// Parks the actor on react, or adopts work that is already waiting.
fn suspend(core: &Arc<ActorCore>, handler: ReactHandler, timeout: Option<Duration>) {
	let mut mailbox = core.mailbox.lock();

	if mailbox.stop_requested {
		drop(handler);
		drop(mailbox);
		terminate(core, Cause::Normal);
		return;
	}

	if let Some(env) = mailbox.queue.pop_front() {
		// Always resume via a fresh pool task to bound stack depth and
		// keep sender threads out of receiver code.
		drop(mailbox);
		core.schedule(Trigger::Message(handler, env));
		return;
	}

	match timeout {
		Some(timeout) if timeout.is_zero() => {
			drop(handler);
			drop(mailbox);
			core.schedule(Trigger::Terminate(Cause::Timeout));
		}
		Some(timeout) => {
			mailbox.pending = Some(handler);
			mailbox.run_state = RunState::Suspended;
			mailbox.generation += 1;
			let generation = mailbox.generation;
			let weak = core.weak_self.clone();
			let timer = timer::shared().schedule(timeout, move || fire_timeout(weak, generation));
			mailbox.timer = Some(timer);
		}
		None => {
			mailbox.pending = Some(handler);
			mailbox.run_state = RunState::Suspended;
			mailbox.generation += 1;
		}
	}
}

fn fire_timeout(weak: Weak<ActorCore>, generation: u64) {
	let Some(core) = weak.upgrade() else {
		return;
	};
	if core.mailbox.lock().claim_timeout(generation) {
		trace!(actor = %core.name, "react timeout fired");
		core.schedule(Trigger::Terminate(Cause::Timeout));
	}
}

/// Unwinds the actor: matching hook, before-stop, drain, after-stop.
fn terminate(core: &Arc<ActorCore>, cause: Cause) {
	let (on_timeout, on_exception, before_stop, after_stop) = {
		let mut hooks = core.hooks.lock();
		(hooks.on_timeout.take(), hooks.on_exception.take(), hooks.before_stop.take(), hooks.after_stop.take())
	};

	match cause {
		Cause::Normal => {}
		Cause::Timeout => {
			if let Some(hook) = on_timeout {
				run_hook(&core.name, "on_timeout", hook);
			}
		}
		Cause::Failure(error) => match on_exception {
			Some(hook) => run_hook(&core.name, "on_exception", move || hook(&error)),
			None => tracing::error!(
				thread = %hooks::current_thread_name(),
				actor = %core.name,
				%error,
				"unhandled error in actor chunk"
			),
		},
	}

	if let Some(hook) = before_stop {
		run_hook(&core.name, "before_stop", hook);
	}

	let drained = core.mailbox.lock().drain();
	for env in &drained {
		env.payload.on_delivery_error();
	}
	match after_stop {
		Some(hook) => run_hook(&core.name, "after_stop", move || hook(drained)),
		None => drop(drained),
	}

	debug!(actor = %core.name, "actor stopped");
	core.done.open();
}

/// Counter for default actor names.
static ACTOR_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Builds a continuation actor with optional lifecycle hooks.
pub struct ActorBuilder {
	name: Option<String>,
	body: BodyFn,
	hooks: Hooks,
}

impl ActorBuilder {
	/// Starts a builder from the actor's first chunk.
	pub fn new(body: impl FnOnce(&mut ActorScope) -> Result<Reaction> + Send + 'static) -> Self {
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

	/// Runs once on the pool before the first chunk.
	pub fn after_start(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
		self.hooks.after_start = Some(Box::new(hook));
		self
	}

	/// Runs right before the mailbox is drained on termination.
	pub fn before_stop(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
		self.hooks.before_stop = Some(Box::new(hook));
		self
	}

	/// Receives the drained, undelivered envelopes on termination.
	pub fn after_stop(mut self, hook: impl FnOnce(Vec<Envelope>) + Send + 'static) -> Self {
		self.hooks.after_stop = Some(Box::new(hook));
		self
	}

	/// Runs when a react timeout expires before a message arrives.
	pub fn on_timeout(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
		self.hooks.on_timeout = Some(Box::new(hook));
		self
	}

	/// Receives errors returned (or panics raised) by the body.
	pub fn on_exception(mut self, hook: impl FnOnce(&Error) + Send + 'static) -> Self {
		self.hooks.on_exception = Some(Box::new(hook));
		self
	}

	/// Runs when a blocking wait is interrupted by shutdown.
	///
	/// Continuation chunks have no blocking waits, so this hook only
	/// fires for the blocking adapter.
	pub fn on_interrupt(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
		self.hooks.on_interrupt = Some(Box::new(hook));
		self
	}

	/// Builds the actor without starting it.
	pub fn build(self, group: &ActorGroup) -> ActorHandle {
		let name = self.name.unwrap_or_else(|| format!("actor-{}", ACTOR_COUNTER.fetch_add(1, Ordering::Relaxed)));
		let body = self.body;
		let hooks = self.hooks;
		let group = group.clone();

		let core = Arc::new_cyclic(|weak| ActorCore {
			name,
			group,
			weak_self: weak.clone(),
			mailbox: Mutex::new(Mailbox::new()),
			body: Mutex::new(Some(body)),
			hooks: Mutex::new(hooks),
			send_replies: Arc::new(AtomicBool::new(true)),
			done: Latch::new(),
		});

		ActorHandle {
			core,
		}
	}

	/// Builds and immediately starts the actor.
	pub fn spawn(self, group: &ActorGroup) -> Result<ActorHandle> {
		let handle = self.build(group);
		handle.start()?;
		Ok(handle)
	}
}

/// Shareable handle to a continuation actor.
#[derive(Clone)]
pub struct ActorHandle {
	core: Arc<ActorCore>,
}

enum StopAction {
	Nothing,
	OpenLatch,
	ScheduleTermination,
}

impl ActorHandle {
	pub fn name(&self) -> &str {
		&self.core.name
	}

	/// Starts the actor by scheduling its first chunk.
	///
	/// Actors are one-shot: starting a started or stopped actor fails.
	pub fn start(&self) -> Result<()> {
		{
			let mut mailbox = self.core.mailbox.lock();
			if mailbox.run_state != RunState::Fresh {
				return weft_core::err!(already_started());
			}
			mailbox.run_state = RunState::Running;
		}
		let body = self.core.body.lock().take().expect("fresh actor holds its body");
		self.core.schedule(Trigger::Start(body));
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
	///
	/// An [`Error`] reply is rethrown on this side.
	pub fn send_and_wait(&self, msg: impl Message) -> Result<Payload> {
		let reply = message::send_and_wait_via(&self.core.name, Box::new(msg), None, |env| self.core.deliver(env))?;
		Ok(reply.expect("untimed wait always yields a reply"))
	}

	/// Like [`send_and_wait`](Self::send_and_wait) with a timeout;
	/// `Ok(None)` when it elapses. The receiving actor is not cancelled.
	pub fn send_and_wait_for(&self, msg: impl Message, timeout: Duration) -> Result<Option<Payload>> {
		message::send_and_wait_via(&self.core.name, Box::new(msg), Some(timeout), |env| self.core.deliver(env))
	}

	/// Requests termination at the next chunk boundary.
	///
	/// Idempotent. A suspended actor unwinds immediately; a running chunk
	/// finishes first.
	pub fn stop(&self) {
		let action = {
			let mut mailbox = self.core.mailbox.lock();
			match mailbox.run_state {
				RunState::Stopped => StopAction::Nothing,
				RunState::Fresh => {
					mailbox.run_state = RunState::Stopped;
					StopAction::OpenLatch
				}
				RunState::Suspended => {
					mailbox.stop_requested = true;
					mailbox.pending = None;
					mailbox.generation += 1;
					if let Some(timer) = mailbox.timer.take() {
						timer.cancel();
					}
					mailbox.run_state = RunState::Running;
					StopAction::ScheduleTermination
				}
				RunState::Running => {
					mailbox.stop_requested = true;
					StopAction::Nothing
				}
			}
		};
		match action {
			StopAction::Nothing => {}
			StopAction::OpenLatch => self.core.done.open(),
			StopAction::ScheduleTermination => self.core.schedule(Trigger::Terminate(Cause::Normal)),
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
		matches!(self.core.mailbox.lock().run_state, RunState::Running | RunState::Suspended)
	}

	/// A weak handle that does not keep the actor alive.
	pub fn downgrade(&self) -> WeakActorHandle {
		WeakActorHandle {
			core: Arc::downgrade(&self.core),
		}
	}
}

impl MessageSink for ActorHandle {
	fn accept(&self, env: Envelope) -> Result<()> {
		self.core.deliver(env)
	}
}

/// Weak counterpart of [`ActorHandle`], for callbacks that must not pin
/// the actor.
#[derive(Clone)]
pub struct WeakActorHandle {
	core: Weak<ActorCore>,
}

impl WeakActorHandle {
	pub fn upgrade(&self) -> Option<ActorHandle> {
		self.core.upgrade().map(|core| ActorHandle {
			core,
		})
	}
}

/// In-chunk view of the actor: reply to the current message, toggle
/// reply capture, reach the own handle.
pub struct ActorScope {
	core: Arc<ActorCore>,
	sender: Option<Recipient>,
}

impl ActorScope {
	pub fn name(&self) -> &str {
		&self.core.name
	}

	/// The reply target of the message currently being processed.
	pub fn sender(&self) -> Option<Recipient> {
		self.sender.clone()
	}

	/// Replies to the sender of the current message.
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

	/// Replies if the current message has a sender; `false` otherwise.
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
	pub fn handle(&self) -> ActorHandle {
		ActorHandle {
			core: self.core.clone(),
		}
	}

	/// Re-enables attaching this actor as sender to outgoing messages.
	pub fn enable_sending_replies(&self) {
		self.core.send_replies.store(true, Ordering::SeqCst);
	}

	/// Stops attaching this actor as sender; replies become impossible.
	pub fn disable_sending_replies(&self) {
		self.core.send_replies.store(false, Ordering::SeqCst);
	}
}
