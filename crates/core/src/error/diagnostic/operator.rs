// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Operator configuration diagnostics.
//!
//! These are raised synchronously by the operator factory, before any
//! worker is scheduled.

use crate::error::diagnostic::Diagnostic;

/// Operator configured without input channels
pub fn empty_inputs() -> Diagnostic {
	Diagnostic {
		code: "OP_001".to_string(),
		message: "operator requires at least one input channel".to_string(),
		label: None,
		help: Some("pass one or more input channels in the operator configuration".to_string()),
		notes: vec![],
		cause: None,
	}
}

/// Body arity does not match the number of input channels
pub fn arity_mismatch(expected: usize, actual: usize) -> Diagnostic {
	Diagnostic {
		code: "OP_002".to_string(),
		message: format!(
			"operator body takes {} value(s) but {} input channel(s) were configured",
			actual, expected
		),
		label: None,
		help: Some("use a body whose arity matches the inputs, or a slice body".to_string()),
		notes: vec![],
		cause: None,
	}
}

/// max_forks must be a positive integer
pub fn invalid_max_forks() -> Diagnostic {
	Diagnostic {
		code: "OP_003".to_string(),
		message: "max_forks must be at least 1".to_string(),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
	}
}

/// Positional emit with the wrong number of values
pub fn output_count_mismatch(outputs: usize, values: usize) -> Diagnostic {
	Diagnostic {
		code: "OP_005".to_string(),
		message: format!("emit carries {} value(s) for {} output channel(s)", values, outputs),
		label: None,
		help: Some("positional emits must supply exactly one value per output".to_string()),
		notes: vec![],
		cause: None,
	}
}

/// Output index out of range
pub fn no_such_output(index: usize, outputs: usize) -> Diagnostic {
	Diagnostic {
		code: "OP_004".to_string(),
		message: format!("no output channel at index {} ({} configured)", index, outputs),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
	}
}
