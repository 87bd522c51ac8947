// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Shared result and diagnostic types for the weft workspace.
//!
//! Every fallible operation in the workspace returns [`Result`], whose
//! error side is a single [`Error`] newtype wrapping a [`Diagnostic`].
//! Diagnostics are created through constructor functions grouped by
//! domain under [`error::diagnostic`] and wrapped with the [`error!`],
//! [`return_error!`] and [`err!`] macros.

pub mod error;

pub use error::{Error, Result, diagnostic};
