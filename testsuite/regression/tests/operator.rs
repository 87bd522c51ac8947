// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Operator scenarios: gathering across channels, duplicated inputs,
//! atomic multi-output emits under parallelism.

use std::{sync::Arc, thread, time::Duration};

use weft::{
	ActorGroup, DataflowQueue, DataflowVariable, OperatorConfig, OperatorScope, ReadChannel, WriteChannel, operator,
};

fn group(name: &str) -> ActorGroup {
	weft_regression::init_tracing();
	ActorGroup::with_threads(name, 6)
}

/// Three single-assignment inputs bound from three tasks produce their
/// sum on the output.
#[test]
fn test_sum_operator_over_variables() {
	let group = group("sum");
	let a = Arc::new(DataflowVariable::<i64>::new());
	let b = Arc::new(DataflowVariable::<i64>::new());
	let c = Arc::new(DataflowVariable::<i64>::new());
	let out = Arc::new(DataflowVariable::<i64>::new());

	// Bound variables keep yielding their value, so the round after the
	// useful one fails on the bound output; the error handler then ends
	// the operator.
	let op = operator(
		&group,
		OperatorConfig::new(vec![
			a.clone() as Arc<dyn ReadChannel<i64>>,
			b.clone() as Arc<dyn ReadChannel<i64>>,
			c.clone() as Arc<dyn ReadChannel<i64>>,
		])
		.outputs(vec![out.clone() as Arc<dyn WriteChannel<i64>>])
		.on_error(|control, _error| control.stop()),
		|scope: &mut OperatorScope<i64>, x: i64, y: i64, z: i64| scope.bind_output(0, x + y + z),
	)
	.expect("operator starts");

	for (variable, value) in [(a, 5i64), (b, 20), (c, 40)] {
		thread::spawn(move || {
			variable.bind(value).expect("bind input");
		});
	}

	assert_eq!(out.get(), 65);

	op.join();
	assert!(!op.is_active());
}

/// The same queue wired into both input positions: values pair up in
/// FIFO order, one per position.
#[test]
fn test_double_wait_on_one_channel() {
	let group = group("double-wait");
	let queue = Arc::new(DataflowQueue::<i64>::new());
	let out = Arc::new(DataflowQueue::<i64>::new());

	let op = operator(
		&group,
		OperatorConfig::new(vec![
			queue.clone() as Arc<dyn ReadChannel<i64>>,
			queue.clone() as Arc<dyn ReadChannel<i64>>,
		])
		.outputs(vec![out.clone() as Arc<dyn WriteChannel<i64>>]),
		|scope: &mut OperatorScope<i64>, x: i64, y: i64| scope.bind_output(0, x + y),
	)
	.expect("operator starts");

	queue.push(1).push(2).push(3).push(4);

	assert_eq!(out.get(), 3);
	assert_eq!(out.get(), 7);

	op.stop();
	op.join();
}

/// Under max_forks = 5, atomic emits keep the three outputs correlated:
/// the lists read from them are identical.
#[test]
fn test_atomic_multi_output_under_forks() {
	let group = group("atomic-emit");
	let input = Arc::new(DataflowQueue::<i64>::new());
	let b = Arc::new(DataflowQueue::<i64>::new());
	let c = Arc::new(DataflowQueue::<i64>::new());
	let d = Arc::new(DataflowQueue::<i64>::new());

	let op = operator(
		&group,
		OperatorConfig::new(vec![input.clone() as Arc<dyn ReadChannel<i64>>])
			.outputs(vec![
				b.clone() as Arc<dyn WriteChannel<i64>>,
				c.clone() as Arc<dyn WriteChannel<i64>>,
				d.clone() as Arc<dyn WriteChannel<i64>>,
			])
			.max_forks(5),
		|scope: &mut OperatorScope<i64>, x: i64| scope.bind_all_outputs_atomically(x),
	)
	.expect("operator starts");

	for value in 1..=10 {
		input.push(value);
	}

	let from_b: Vec<i64> = (0..10).map(|_| b.get()).collect();
	let from_c: Vec<i64> = (0..10).map(|_| c.get()).collect();
	let from_d: Vec<i64> = (0..10).map(|_| d.get()).collect();

	// Cross-output correlation: every index carries one apply's value
	// on all three channels.
	assert_eq!(from_b, from_c);
	assert_eq!(from_b, from_d);

	// And nothing was lost: the emitted values are a permutation of the
	// input.
	let mut sorted = from_b.clone();
	sorted.sort_unstable();
	assert_eq!(sorted, (1..=10).collect::<Vec<i64>>());

	op.stop();
	op.join();
}

/// With a single fork, emitted outputs preserve input order.
#[test]
fn test_sequential_operator_preserves_order() {
	let group = group("sequential");
	let input = Arc::new(DataflowQueue::<i64>::new());
	let out = Arc::new(DataflowQueue::<i64>::new());

	let op = operator(
		&group,
		OperatorConfig::new(vec![input.clone() as Arc<dyn ReadChannel<i64>>])
			.outputs(vec![out.clone() as Arc<dyn WriteChannel<i64>>]),
		|scope: &mut OperatorScope<i64>, x: i64| scope.bind_output(0, x * x),
	)
	.expect("operator starts");

	for value in 1..=8 {
		input.push(value);
	}

	let squares: Vec<i64> = (0..8).map(|_| out.get()).collect();
	assert_eq!(squares, vec![1, 4, 9, 16, 25, 36, 49, 64]);

	op.stop();
	op.join();
}

/// Operators chain through shared queues.
#[test]
fn test_operator_pipeline() {
	let group = group("pipeline");
	let source = Arc::new(DataflowQueue::<i64>::new());
	let middle = Arc::new(DataflowQueue::<i64>::new());
	let sink = Arc::new(DataflowQueue::<i64>::new());

	let double = operator(
		&group,
		OperatorConfig::new(vec![source.clone() as Arc<dyn ReadChannel<i64>>])
			.outputs(vec![middle.clone() as Arc<dyn WriteChannel<i64>>]),
		|scope: &mut OperatorScope<i64>, x: i64| scope.bind_output(0, x * 2),
	)
	.expect("double starts");

	let increment = operator(
		&group,
		OperatorConfig::new(vec![middle.clone() as Arc<dyn ReadChannel<i64>>])
			.outputs(vec![sink.clone() as Arc<dyn WriteChannel<i64>>]),
		|scope: &mut OperatorScope<i64>, x: i64| scope.bind_output(0, x + 1),
	)
	.expect("increment starts");

	for value in 1..=5 {
		source.push(value);
	}

	let results: Vec<i64> = (0..5).map(|_| sink.get()).collect();
	assert_eq!(results, vec![3, 5, 7, 9, 11]);

	double.stop();
	increment.stop();
	double.join();
	increment.join();
}

/// join_for reports completion once the driver and all forks are done.
#[test]
fn test_join_with_timeout() {
	let group = group("join");
	let input = Arc::new(DataflowQueue::<i64>::new());

	let op = operator(
		&group,
		OperatorConfig::new(vec![input.clone() as Arc<dyn ReadChannel<i64>>]).max_forks(2),
		|_scope: &mut OperatorScope<i64>, _x: i64| Ok(()),
	)
	.expect("operator starts");

	assert!(!op.join_for(Duration::from_millis(10)), "running operator does not join");

	op.stop();
	assert!(op.join_for(Duration::from_secs(1)), "stopped operator joins");
}
