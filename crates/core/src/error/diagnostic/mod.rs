// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Diagnostic payloads carried by [`Error`](crate::Error).
//!
//! Constructor functions are grouped by domain:
//! - [`actor`]: actor lifecycle and message delivery
//! - [`dataflow`]: single-assignment and channel violations
//! - [`operator`]: operator configuration

pub mod actor;
pub mod dataflow;
pub mod operator;

/// A structured description of a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
	/// Stable machine-readable code, e.g. `FLOW_001`.
	pub code: String,
	/// Human-readable one-line description.
	pub message: String,
	/// Short annotation pointing at the offending entity.
	pub label: Option<String>,
	/// Suggested remedy.
	pub help: Option<String>,
	/// Additional free-form context lines.
	pub notes: Vec<String>,
	/// The diagnostic this one was caused by, if any.
	pub cause: Option<Box<Diagnostic>>,
}

impl Diagnostic {
	/// Renders the diagnostic into a multi-line display string.
	pub fn render(&self) -> String {
		let mut out = format!("{}: {}", self.code, self.message);
		if let Some(label) = &self.label {
			out.push_str("\n  label: ");
			out.push_str(label);
		}
		if let Some(help) = &self.help {
			out.push_str("\n  help: ");
			out.push_str(help);
		}
		for note in &self.notes {
			out.push_str("\n  note: ");
			out.push_str(note);
		}
		if let Some(cause) = &self.cause {
			out.push_str("\n  caused by: ");
			out.push_str(cause.render().as_str());
		}
		out
	}
}
