// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

/// Creates an [`Error`](crate::Error) from a diagnostic constructor call.
///
/// Usage: `error!(already_bound())`
#[macro_export]
macro_rules! error {
	($diagnostic:expr) => {
		$crate::error::Error($diagnostic)
	};
}

/// Returns early with an error built from a diagnostic constructor call.
///
/// Usage: `return_error!(empty_inputs())`
#[macro_export]
macro_rules! return_error {
	($diagnostic:expr) => {
		return Err($crate::error::Error($diagnostic))
	};
}

/// Creates an `Err(Error(..))` from a diagnostic constructor call.
///
/// Usage: `err!(no_sender())`
#[macro_export]
macro_rules! err {
	($diagnostic:expr) => {
		Err($crate::error::Error($diagnostic))
	};
}
