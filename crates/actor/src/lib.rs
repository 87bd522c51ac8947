// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Continuation-style actors on shared worker pools.
//!
//! An actor's body is a sequence of chunks: closures submitted to its
//! group's pool. Between chunks the actor holds no thread — a chunk ends
//! by returning a [`Reaction`], and when it suspends with
//! [`Reaction::React`] the next chunk is scheduled only once a message
//! arrives (or the react timeout fires). The [`blocking`] module offers
//! the alternative adapter that keeps one worker for its whole lifetime
//! while exposing the same send/reply/stop surface.
//!
//! # Execution model
//!
//! - At most one chunk per actor is queued or running at any time.
//! - Messages carry an optional sender, captured from the thread-local
//!   current-actor binding of the sending thread.
//! - `stop()` is cooperative: it takes effect at the next chunk boundary,
//!   draining the mailbox through the `on_delivery_error` hook of each
//!   undelivered payload.

pub mod blocking;
pub mod group;
mod hooks;
mod local;
mod mailbox;
pub mod message;
pub mod pooled;

pub use blocking::{BlockingActorBuilder, BlockingActorHandle, BlockingScope};
pub use group::{ActorGroup, default_group};
pub use message::{Envelope, Message, MessageSink, Payload, Recipient};
pub use pooled::{ActorBuilder, ActorHandle, ActorScope, Reaction, WeakActorHandle, react, react_within};
