// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Dataflow operator runtime.
//!
//! An operator is a long-running node: it gathers one value from each
//! input channel, applies the user body and re-arms for the next round
//! until stopped. Orchestration runs in one driver actor per operator;
//! with `max_forks > 1` up to that many rounds are applied concurrently
//! on the group's pool while the gather phase stays sequential, keeping
//! per-channel input order intact. Atomic emits serialize on the
//! operator's emit lock, so cross-output correlation follows emit order
//! even under parallel applies.

mod body;

use std::{
	panic::{AssertUnwindSafe, catch_unwind},
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use tracing::trace;
use weft_actor::{ActorBuilder, ActorGroup, ActorHandle, ActorScope, Message, Reaction, WeakActorHandle, react};
use weft_core::{
	Error, Result,
	diagnostic::actor::user_panic,
	diagnostic::operator::{arity_mismatch, empty_inputs, invalid_max_forks, no_such_output, output_count_mismatch},
};

use crate::channel::{ReadChannel, WriteChannel};

pub use body::{IntoOperatorBody, OperatorBodyFn, SliceBody, from_slice};

/// Callback receiving errors raised by the operator body.
pub type ErrorHandler = Arc<dyn Fn(&OperatorControl, &Error) + Send + Sync>;

/// Wiring and tuning of one operator.
pub struct OperatorConfig<T> {
	inputs: Vec<Arc<dyn ReadChannel<T>>>,
	outputs: Vec<Arc<dyn WriteChannel<T>>>,
	max_forks: usize,
	on_error: Option<ErrorHandler>,
}

impl<T: Send + Clone + 'static> OperatorConfig<T> {
	/// Configures an operator reading from `inputs`, in order.
	pub fn new(inputs: Vec<Arc<dyn ReadChannel<T>>>) -> Self {
		Self {
			inputs,
			outputs: Vec::new(),
			max_forks: 1,
			on_error: None,
		}
	}

	/// Ordered output channels; default none.
	pub fn outputs(mut self, outputs: Vec<Arc<dyn WriteChannel<T>>>) -> Self {
		self.outputs = outputs;
		self
	}

	/// Upper bound on concurrently applied rounds; default 1.
	pub fn max_forks(mut self, max_forks: usize) -> Self {
		self.max_forks = max_forks;
		self
	}

	/// Replaces the default log-and-continue error handler.
	///
	/// The handler may stop the operator through the control it is
	/// given.
	pub fn on_error(mut self, handler: impl Fn(&OperatorControl, &Error) + Send + Sync + 'static) -> Self {
		self.on_error = Some(Arc::new(handler));
		self
	}
}

/// Lets an error handler act on its operator without owning it.
pub struct OperatorControl {
	driver: WeakActorHandle,
}

impl OperatorControl {
	/// Stops the operator at its next safe point.
	pub fn stop(&self) {
		if let Some(driver) = self.driver.upgrade() {
			driver.stop();
		}
	}
}

/// The body's view of the operator during one apply.
pub struct OperatorScope<T> {
	outputs: Arc<[Arc<dyn WriteChannel<T>>]>,
	emit_lock: Arc<Mutex<()>>,
}

impl<T: Send + Clone + 'static> OperatorScope<T> {
	pub fn output_count(&self) -> usize {
		self.outputs.len()
	}

	/// Binds `value` to the output at `index`.
	pub fn bind_output(&self, index: usize, value: T) -> Result<()> {
		match self.outputs.get(index) {
			Some(output) => output.write(value),
			None => weft_core::err!(no_such_output(index, self.outputs.len())),
		}
	}

	/// Binds `value` to every output.
	pub fn bind_all_outputs(&self, value: T) -> Result<()> {
		for output in self.outputs.iter() {
			output.write(value.clone())?;
		}
		Ok(())
	}

	/// Binds one value per output, positionally.
	pub fn bind_all_output_values(&self, values: &[T]) -> Result<()> {
		if values.len() != self.outputs.len() {
			return weft_core::err!(output_count_mismatch(self.outputs.len(), values.len()));
		}
		for (output, value) in self.outputs.iter().zip(values) {
			output.write(value.clone())?;
		}
		Ok(())
	}

	/// Like [`bind_all_outputs`](Self::bind_all_outputs), under the
	/// operator's emit lock: concurrent applies emit in lock order on
	/// every output.
	pub fn bind_all_outputs_atomically(&self, value: T) -> Result<()> {
		let _emit = self.emit_lock.lock();
		self.bind_all_outputs(value)
	}

	/// Positional variant of the atomic emit.
	pub fn bind_all_output_values_atomically(&self, values: &[T]) -> Result<()> {
		let _emit = self.emit_lock.lock();
		self.bind_all_output_values(values)
	}
}

/// Counts in-flight forked applies so `join` can wait them out.
struct ForkTracker {
	active: Mutex<usize>,
	cond: Condvar,
}

impl ForkTracker {
	fn new() -> Self {
		Self {
			active: Mutex::new(0),
			cond: Condvar::new(),
		}
	}

	fn enter(&self) {
		*self.active.lock() += 1;
	}

	fn exit(&self) {
		let mut active = self.active.lock();
		*active -= 1;
		if *active == 0 {
			self.cond.notify_all();
		}
	}

	fn wait_idle(&self) {
		let mut active = self.active.lock();
		while *active > 0 {
			self.cond.wait(&mut active);
		}
	}

	fn wait_idle_until(&self, deadline: Instant) -> bool {
		let mut active = self.active.lock();
		while *active > 0 {
			if self.cond.wait_until(&mut active, deadline).timed_out() {
				return *active == 0;
			}
		}
		true
	}
}

/// One value arriving for one input position.
struct GatheredValue<T> {
	index: usize,
	value: T,
}

impl<T: Send + 'static> Message for GatheredValue<T> {}

/// A forked apply finished; a parallelism slot is free again.
struct ApplyDone;

impl Message for ApplyDone {}

/// Everything a driver round needs, moved through the react chain.
struct DriverState<T> {
	inputs: Arc<[Arc<dyn ReadChannel<T>>]>,
	outputs: Arc<[Arc<dyn WriteChannel<T>>]>,
	body: OperatorBodyFn<T>,
	on_error: ErrorHandler,
	emit_lock: Arc<Mutex<()>>,
	max_forks: usize,
	group: ActorGroup,
	forks: Arc<ForkTracker>,
	/// Positional slots of the round being gathered.
	pending: Vec<Option<T>>,
	filled: usize,
	in_flight: usize,
	/// All parallelism slots are busy; re-arm on the next ApplyDone.
	waiting: bool,
}

impl<T: Send + Clone + 'static> DriverState<T> {
	/// Requests one value per input position, in order.
	///
	/// Ordering per channel follows from issuing the asynchronous reads
	/// positionally while the driver is single-threaded: a channel
	/// appearing in several positions serves them oldest-first.
	fn arm(&mut self, scope: &ActorScope) {
		self.pending = (0..self.inputs.len()).map(|_| None).collect();
		self.filled = 0;
		let weak = scope.handle().downgrade();
		for (index, input) in self.inputs.iter().enumerate() {
			let weak = weak.clone();
			input.read_async(Box::new(move |value| {
				// Weak: a stopped operator must not be pinned alive by
				// callbacks parked in long-lived channels.
				if let Some(driver) = weak.upgrade() {
					let _ = driver.send(GatheredValue {
						index,
						value,
					});
				}
			}));
		}
	}

	fn on_value(&mut self, scope: &ActorScope, index: usize, value: T) {
		if self.pending[index].is_none() {
			self.filled += 1;
		}
		self.pending[index] = Some(value);

		if self.filled == self.inputs.len() {
			let values: Vec<T> = self.pending.iter_mut().map(|slot| slot.take().expect("round complete")).collect();
			self.dispatch(scope, values);
		}
	}

	fn dispatch(&mut self, scope: &ActorScope, values: Vec<T>) {
		let control = OperatorControl {
			driver: scope.handle().downgrade(),
		};

		if self.max_forks == 1 {
			run_apply(&self.body, &self.outputs, &self.emit_lock, &self.on_error, &control, &values);
			self.arm(scope);
			return;
		}

		self.in_flight += 1;
		self.forks.enter();

		let body = self.body.clone();
		let outputs = self.outputs.clone();
		let emit_lock = self.emit_lock.clone();
		let on_error = self.on_error.clone();
		let forks = self.forks.clone();
		let driver = scope.handle().downgrade();
		self.group.schedule(move || {
			run_apply(&body, &outputs, &emit_lock, &on_error, &control, &values);
			forks.exit();
			if let Some(driver) = driver.upgrade() {
				let _ = driver.send(ApplyDone);
			}
		});

		if self.in_flight < self.max_forks {
			self.arm(scope);
		} else {
			trace!(in_flight = self.in_flight, "operator saturated, gather parked");
			self.waiting = true;
		}
	}

	fn on_apply_done(&mut self, scope: &ActorScope) {
		self.in_flight -= 1;
		if self.waiting {
			self.waiting = false;
			self.arm(scope);
		}
	}
}

fn run_apply<T: Send + Clone + 'static>(
	body: &OperatorBodyFn<T>,
	outputs: &Arc<[Arc<dyn WriteChannel<T>>]>,
	emit_lock: &Arc<Mutex<()>>,
	on_error: &ErrorHandler,
	control: &OperatorControl,
	values: &[T],
) {
	let mut scope = OperatorScope {
		outputs: outputs.clone(),
		emit_lock: emit_lock.clone(),
	};
	match catch_unwind(AssertUnwindSafe(|| body(&mut scope, values))) {
		Ok(Ok(())) => {}
		Ok(Err(error)) => on_error(control, &error),
		Err(payload) => {
			let detail = if let Some(s) = payload.downcast_ref::<&str>() {
				(*s).to_string()
			} else if let Some(s) = payload.downcast_ref::<String>() {
				s.clone()
			} else {
				"<non-string panic payload>".to_string()
			};
			on_error(control, &weft_core::error!(user_panic(&detail)));
		}
	}
}

fn gather_loop<T: Send + Clone + 'static>(mut state: DriverState<T>) -> Reaction {
	react(move |scope, msg| {
		let msg = match msg.downcast::<GatheredValue<T>>() {
			Ok(gathered) => {
				state.on_value(scope, gathered.index, gathered.value);
				return Ok(gather_loop(state));
			}
			Err(other) => other,
		};
		if msg.is::<ApplyDone>() {
			state.on_apply_done(scope);
		}
		Ok(gather_loop(state))
	})
}

/// Counter for default operator names.
static OPERATOR_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handle to a running operator.
pub struct Operator<T> {
	driver: ActorHandle,
	outputs: Arc<[Arc<dyn WriteChannel<T>>]>,
	forks: Arc<ForkTracker>,
}

impl<T> std::fmt::Debug for Operator<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Operator").finish_non_exhaustive()
	}
}

impl<T: Send + Clone + 'static> Operator<T> {
	/// Asks the driver to terminate at the next safe point, between
	/// gather and apply. Values already gathered for an unfinished
	/// round are not consumed.
	pub fn stop(&self) {
		self.driver.stop();
	}

	/// Blocks until the driver and every forked apply have finished.
	pub fn join(&self) {
		self.driver.join();
		self.forks.wait_idle();
	}

	/// Like [`join`](Self::join) with a timeout; `true` on completion.
	pub fn join_for(&self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		if !self.driver.join_for(timeout) {
			return false;
		}
		self.forks.wait_idle_until(deadline)
	}

	/// Whether the operator still consumes input.
	pub fn is_active(&self) -> bool {
		self.driver.is_active()
	}

	/// The first output channel, when one is configured.
	pub fn output(&self) -> Option<Arc<dyn WriteChannel<T>>> {
		self.outputs.first().cloned()
	}
}

/// Builds and starts an operator.
///
/// Configuration problems — no inputs, `max_forks` of zero, a body
/// whose arity does not match the inputs — fail synchronously before
/// anything runs.
pub fn operator<T, B, Marker>(group: &ActorGroup, config: OperatorConfig<T>, body: B) -> Result<Operator<T>>
where
	T: Send + Clone + 'static,
	B: IntoOperatorBody<T, Marker>,
{
	if config.inputs.is_empty() {
		return weft_core::err!(empty_inputs());
	}
	if config.max_forks == 0 {
		return weft_core::err!(invalid_max_forks());
	}
	if let Some(arity) = body.arity() {
		if arity != config.inputs.len() {
			return weft_core::err!(arity_mismatch(config.inputs.len(), arity));
		}
	}

	let inputs: Arc<[Arc<dyn ReadChannel<T>>]> = config.inputs.into();
	let outputs: Arc<[Arc<dyn WriteChannel<T>>]> = config.outputs.into();
	let forks = Arc::new(ForkTracker::new());
	let on_error = config.on_error.unwrap_or_else(default_error_handler);

	let state = DriverState {
		inputs,
		outputs: outputs.clone(),
		body: body.into_body(),
		on_error,
		emit_lock: Arc::new(Mutex::new(())),
		max_forks: config.max_forks,
		group: group.clone(),
		forks: forks.clone(),
		pending: Vec::new(),
		filled: 0,
		in_flight: 0,
		waiting: false,
	};

	let name = format!("operator-{}", OPERATOR_COUNTER.fetch_add(1, Ordering::Relaxed));
	let driver = ActorBuilder::new(move |scope| {
		let mut state = state;
		state.arm(scope);
		Ok(gather_loop(state))
	})
	.name(name)
	.spawn(group)?;

	Ok(Operator {
		driver,
		outputs,
		forks,
	})
}

fn default_error_handler() -> ErrorHandler {
	Arc::new(|_control, error| {
		tracing::error!(
			thread = %std::thread::current().name().unwrap_or("<unnamed>"),
			%error,
			"operator body failed"
		);
	})
}
