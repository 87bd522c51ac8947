// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

use std::{
	fmt::{Display, Formatter},
	ops::{Deref, DerefMut},
};

pub mod diagnostic;
mod r#macro;

use diagnostic::Diagnostic;

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The single error type of the workspace.
///
/// An error is a thin wrapper around the [`Diagnostic`] that describes it;
/// callers match on [`Diagnostic::code`] when they need to react to a
/// specific failure.
#[derive(Debug, PartialEq)]
pub struct Error(pub Diagnostic);

impl Deref for Error {
	type Target = Diagnostic;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for Error {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.0.render().as_str())
	}
}

impl Error {
	/// Consumes the error, returning the underlying diagnostic.
	pub fn diagnostic(self) -> Diagnostic {
		self.0
	}

	/// Stable diagnostic code, e.g. `ACTOR_005`.
	pub fn code(&self) -> &str {
		&self.0.code
	}
}

impl std::error::Error for Error {}
