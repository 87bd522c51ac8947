// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Actor lifecycle and delivery diagnostics.

use crate::error::diagnostic::Diagnostic;

/// Operation requires a started actor
pub fn not_started(op: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_001".to_string(),
		message: format!("cannot {} on an actor that has not been started", op),
		label: None,
		help: Some("call start() before interacting with the actor".to_string()),
		notes: vec![],
		cause: None,
	}
}

/// Actor was already started, or is stopped and cannot be restarted
pub fn already_started() -> Diagnostic {
	Diagnostic {
		code: "ACTOR_002".to_string(),
		message: "actor has already been started".to_string(),
		label: None,
		help: Some("actors are one-shot; create a new actor instead of restarting".to_string()),
		notes: vec![],
		cause: None,
	}
}

/// Reply requested but the current message carries no sender
pub fn no_sender() -> Diagnostic {
	Diagnostic {
		code: "ACTOR_003".to_string(),
		message: "cannot reply: the current message has no sender".to_string(),
		label: None,
		help: Some(
			"the message was sent from outside any actor, or the sender disabled reply capture"
				.to_string(),
		),
		notes: vec![],
		cause: None,
	}
}

/// Reply requested while sending replies is disabled on this actor
pub fn replies_disabled() -> Diagnostic {
	Diagnostic {
		code: "ACTOR_004".to_string(),
		message: "cannot reply: sending replies is disabled on this actor".to_string(),
		label: None,
		help: Some("call enable_sending_replies() before replying".to_string()),
		notes: vec![],
		cause: None,
	}
}

/// Message could not be delivered to a stopped actor
pub fn delivery_refused(actor: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_005".to_string(),
		message: format!("message refused: actor '{}' has stopped", actor),
		label: None,
		help: None,
		notes: vec!["the payload's on_delivery_error hook has been invoked".to_string()],
		cause: None,
	}
}

/// A blocking wait was interrupted by actor shutdown
pub fn interrupted(actor: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_006".to_string(),
		message: format!("blocking wait interrupted: actor '{}' is stopping", actor),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
	}
}

/// Actor finished processing a message without sending the awaited reply
pub fn no_reply(actor: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_008".to_string(),
		message: format!("actor '{}' finished without replying", actor),
		label: None,
		help: Some("the receiving actor must call reply() for send_and_wait to complete".to_string()),
		notes: vec![],
		cause: None,
	}
}

/// User code panicked inside an actor chunk or hook
pub fn user_panic(detail: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_007".to_string(),
		message: format!("user code panicked: {}", detail),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
	}
}
