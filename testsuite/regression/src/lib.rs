// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Shared setup for the regression scenarios in `tests/`.

use std::sync::Once;

/// Installs the diagnostic sink once per test process.
///
/// Log output is controlled through `RUST_LOG`, e.g.
/// `RUST_LOG=weft_actor=trace cargo test`.
pub fn init_tracing() {
	static INIT: Once = Once::new();
	INIT.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_test_writer()
			.try_init();
	});
}
