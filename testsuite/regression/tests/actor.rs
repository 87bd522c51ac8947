// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Actor scenarios: request/reply conversations, react timeouts,
//! ordering and drain guarantees.

use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
	time::Duration,
};

use weft::{ActorBuilder, ActorGroup, Latch, Message, Reaction, react, react_within};
use weft_testing::wait_for;

fn group(name: &str) -> ActorGroup {
	weft_regression::init_tracing();
	ActorGroup::with_threads(name, 4)
}

/// A ping is answered with a pong within the second.
#[test]
fn test_ping_pong_conversation() {
	let group = group("ping-pong");
	let (tx, rx) = crossbeam_channel::bounded(1);

	let ponger = group
		.actor(|_scope| {
			Ok(react(|scope, msg| {
				assert_eq!(msg.downcast_ref::<&'static str>(), Some(&"ping"));
				scope.reply("pong")?;
				Ok(Reaction::Done)
			}))
		})
		.expect("ponger starts");

	let pinger = group
		.actor(move |_scope| {
			ponger.send("ping")?;
			Ok(react(move |_scope, msg| {
				let _ = tx.send(*msg.downcast::<&'static str>().expect("pong payload"));
				Ok(Reaction::Done)
			}))
		})
		.expect("pinger starts");

	assert_eq!(rx.recv_timeout(Duration::from_secs(1)).expect("reply in time"), "pong");
	pinger.join();
}

/// A stopped receiver refuses the send and the payload's delivery hook
/// fires.
#[test]
fn test_ping_against_stopped_actor_fails_delivery() {
	struct Ping(Arc<AtomicUsize>);
	impl Message for Ping {
		fn on_delivery_error(&self) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	let group = group("dead-ping");
	let undelivered = Arc::new(AtomicUsize::new(0));

	let ponger = group.actor(|_scope| Ok(Reaction::Done)).expect("ponger starts");
	ponger.join();

	let error = ponger.send(Ping(undelivered.clone())).expect_err("stopped actor refuses");
	assert_eq!(error.code(), "ACTOR_005");
	assert_eq!(undelivered.load(Ordering::SeqCst), 1);
}

/// A react timeout with no sender fires the on-timeout hook exactly
/// once and the drain list is empty.
#[test]
fn test_react_timeout_unwinds_cleanly() {
	let group = group("react-timeout");
	let timeouts = Arc::new(AtomicUsize::new(0));
	let drained = Arc::new(Mutex::new(None));

	let timeouts_clone = timeouts.clone();
	let drained_clone = drained.clone();
	let actor = ActorBuilder::new(|_scope| {
		Ok(react_within(Duration::from_millis(100), |_scope, _msg| Ok(Reaction::Done)))
	})
	.on_timeout(move || {
		timeouts_clone.fetch_add(1, Ordering::SeqCst);
	})
	.after_stop(move |envelopes| {
		*drained_clone.lock().unwrap() = Some(envelopes.len());
	})
	.spawn(&group)
	.expect("actor starts");

	actor.join();
	assert_eq!(timeouts.load(Ordering::SeqCst), 1);
	assert_eq!(*drained.lock().unwrap(), Some(0));
}

/// Messages sent from one thread arrive in send order, interleaved or
/// not with another sender.
#[test]
fn test_per_sender_ordering_is_preserved() {
	let group = group("ordering");
	let seen = Arc::new(Mutex::new(Vec::new()));

	const PER_SENDER: i64 = 100;

	fn collect(seen: Arc<Mutex<Vec<i64>>>, remaining: usize) -> Reaction {
		react(move |_scope, msg| {
			seen.lock().unwrap().push(*msg.downcast::<i64>().expect("i64 payload"));
			if remaining == 1 {
				Ok(Reaction::Done)
			} else {
				Ok(collect(seen, remaining - 1))
			}
		})
	}

	let seen_clone = seen.clone();
	let actor = group
		.actor(move |_scope| Ok(collect(seen_clone, (PER_SENDER * 2) as usize)))
		.expect("actor starts");

	let mut senders = Vec::new();
	for sender_id in 0..2i64 {
		let actor = actor.clone();
		senders.push(thread::spawn(move || {
			for i in 0..PER_SENDER {
				actor.send(sender_id * PER_SENDER + i).expect("send");
			}
		}));
	}
	for sender in senders {
		sender.join().expect("sender finishes");
	}

	actor.join();

	let seen = seen.lock().unwrap();
	for sender_id in 0..2i64 {
		let own: Vec<i64> =
			seen.iter().copied().filter(|v| v / PER_SENDER == sender_id).collect();
		let expected: Vec<i64> = (0..PER_SENDER).map(|i| sender_id * PER_SENDER + i).collect();
		assert_eq!(own, expected, "sender {} order broken", sender_id);
	}
}

/// Sends accepted before stop but never consumed come back out through
/// the after-stop drain, in order.
#[test]
fn test_drain_equals_unconsumed_sends() {
	let group = group("drain");
	let entered = Arc::new(Latch::new());
	let gate = Arc::new(Latch::new());
	let drained = Arc::new(Mutex::new(Vec::new()));

	let entered_clone = entered.clone();
	let gate_clone = gate.clone();
	let drained_clone = drained.clone();
	let actor = ActorBuilder::new(move |_scope| {
		Ok(react(move |_scope, _msg| {
			entered_clone.open();
			gate_clone.wait();
			Ok(react(|_s, _m| Ok(Reaction::Done)))
		}))
	})
	.after_stop(move |envelopes| {
		let mut drained = drained_clone.lock().unwrap();
		for env in envelopes {
			drained.push(*env.payload.downcast::<i32>().expect("i32 payload"));
		}
	})
	.spawn(&group)
	.expect("actor starts");

	actor.send(0).expect("consumed by the waiting handler");
	entered.wait();
	for value in 1..=4 {
		actor.send(value).expect("queued");
	}
	actor.stop();
	gate.open();
	actor.join();

	assert_eq!(*drained.lock().unwrap(), vec![1, 2, 3, 4]);
}

/// send_and_wait returns the reply, or None on timeout, and the
/// receiver keeps running after a timed-out wait.
#[test]
fn test_send_and_wait_timeout_leaves_receiver_running() {
	let group = group("wait-timeout");

	let slow = group
		.blocking_actor(|scope| {
			loop {
				let msg = scope.receive()?;
				if msg.downcast_ref::<&'static str>() == Some(&"slow") {
					thread::sleep(Duration::from_millis(100));
					scope.reply("late")?;
				} else {
					scope.reply("fast")?;
				}
			}
		})
		.expect("actor starts");

	let timed_out = slow.send_and_wait_for("slow", Duration::from_millis(10)).expect("wait");
	assert!(timed_out.is_none());

	wait_for(|| slow.is_active(), "receiver survives the timed-out wait");
	let reply = slow.send_and_wait("quick").expect("reply");
	assert_eq!(reply.downcast_ref::<&'static str>(), Some(&"fast"));

	slow.stop();
	slow.join();
}

/// The blocking adapter answers through the same reply surface as the
/// pooled actor.
#[test]
fn test_pooled_actor_talks_to_blocking_actor() {
	let group = group("mixed");
	let (tx, rx) = crossbeam_channel::bounded(1);

	let doubler = group
		.blocking_actor(|scope| {
			let msg = scope.receive()?;
			let value = *msg.downcast::<i32>().expect("i32 payload");
			scope.reply(value * 2)?;
			Ok(())
		})
		.expect("doubler starts");

	let caller = group
		.actor(move |_scope| {
			doubler.send(21)?;
			Ok(react(move |_scope, msg| {
				let _ = tx.send(*msg.downcast::<i32>().expect("i32 reply"));
				Ok(Reaction::Done)
			}))
		})
		.expect("caller starts");

	assert_eq!(rx.recv_timeout(Duration::from_secs(1)).expect("reply"), 42);
	caller.join();
}
