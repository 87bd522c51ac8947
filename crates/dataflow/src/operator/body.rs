// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Operator bodies.
//!
//! A body is the user function applied to each gathered round of input
//! values. Fixed-arity closures carry their arity so the factory can
//! check it against the number of configured inputs; [`from_slice`]
//! accepts any arity and receives the round as a slice.

use std::sync::Arc;

use weft_core::Result;

use crate::operator::OperatorScope;

/// The erased form every body is driven through.
pub type OperatorBodyFn<T> = Arc<dyn Fn(&mut OperatorScope<T>, &[T]) -> Result<()> + Send + Sync>;

/// Conversion of closures into operator bodies.
///
/// The `Marker` parameter distinguishes the closure shapes; callers
/// never name it.
pub trait IntoOperatorBody<T, Marker> {
	/// Declared arity, or `None` for slice bodies accepting any.
	fn arity(&self) -> Option<usize>;

	fn into_body(self) -> OperatorBodyFn<T>;
}

impl<T, F> IntoOperatorBody<T, (T,)> for F
where
	T: Send + Clone + 'static,
	F: Fn(&mut OperatorScope<T>, T) -> Result<()> + Send + Sync + 'static,
{
	fn arity(&self) -> Option<usize> {
		Some(1)
	}

	fn into_body(self) -> OperatorBodyFn<T> {
		Arc::new(move |scope, values| self(scope, values[0].clone()))
	}
}

impl<T, F> IntoOperatorBody<T, (T, T)> for F
where
	T: Send + Clone + 'static,
	F: Fn(&mut OperatorScope<T>, T, T) -> Result<()> + Send + Sync + 'static,
{
	fn arity(&self) -> Option<usize> {
		Some(2)
	}

	fn into_body(self) -> OperatorBodyFn<T> {
		Arc::new(move |scope, values| self(scope, values[0].clone(), values[1].clone()))
	}
}

impl<T, F> IntoOperatorBody<T, (T, T, T)> for F
where
	T: Send + Clone + 'static,
	F: Fn(&mut OperatorScope<T>, T, T, T) -> Result<()> + Send + Sync + 'static,
{
	fn arity(&self) -> Option<usize> {
		Some(3)
	}

	fn into_body(self) -> OperatorBodyFn<T> {
		Arc::new(move |scope, values| self(scope, values[0].clone(), values[1].clone(), values[2].clone()))
	}
}

impl<T, F> IntoOperatorBody<T, (T, T, T, T)> for F
where
	T: Send + Clone + 'static,
	F: Fn(&mut OperatorScope<T>, T, T, T, T) -> Result<()> + Send + Sync + 'static,
{
	fn arity(&self) -> Option<usize> {
		Some(4)
	}

	fn into_body(self) -> OperatorBodyFn<T> {
		Arc::new(move |scope, values| {
			self(scope, values[0].clone(), values[1].clone(), values[2].clone(), values[3].clone())
		})
	}
}

/// A body receiving each round as a slice, usable with any number of
/// inputs.
pub struct SliceBody<F>(F);

/// Wraps a slice-taking closure into an operator body of any arity.
pub fn from_slice<T, F>(body: F) -> SliceBody<F>
where
	T: Send + Clone + 'static,
	F: Fn(&mut OperatorScope<T>, &[T]) -> Result<()> + Send + Sync + 'static,
{
	SliceBody(body)
}

impl<T, F> IntoOperatorBody<T, ()> for SliceBody<F>
where
	T: Send + Clone + 'static,
	F: Fn(&mut OperatorScope<T>, &[T]) -> Result<()> + Send + Sync + 'static,
{
	fn arity(&self) -> Option<usize> {
		None
	}

	fn into_body(self) -> OperatorBodyFn<T> {
		let body = self.0;
		Arc::new(move |scope, values| body(scope, values))
	}
}
