// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Dataflow channel diagnostics.

use crate::error::diagnostic::Diagnostic;

/// Second bind attempt on a single-assignment variable
pub fn already_bound() -> Diagnostic {
	Diagnostic {
		code: "FLOW_001".to_string(),
		message: "dataflow variable is already bound".to_string(),
		label: None,
		help: Some("a dataflow variable can be bound exactly once".to_string()),
		notes: vec![],
		cause: None,
	}
}

/// bind_unique with a value different from the existing binding
pub fn bound_to_different_value() -> Diagnostic {
	Diagnostic {
		code: "FLOW_002".to_string(),
		message: "dataflow variable is already bound to a different value".to_string(),
		label: None,
		help: Some("bind_unique succeeds only when the values compare equal".to_string()),
		notes: vec![],
		cause: None,
	}
}
