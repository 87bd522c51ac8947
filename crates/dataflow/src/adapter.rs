// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Weft

//! Channel adapters over streams.
//!
//! A [`DataflowStream`] is a cons-list, not a cursor, so it cannot
//! implement the channel traits directly. The adapters add the cursor:
//! the read adapter walks the cells and yields `Option<T>` values where
//! `None` is the end-of-stream marker; the write adapter appends values
//! cell by cell, serializing concurrent producers. Operators work over
//! streams by using `Option<T>` as their value type and stopping on
//! `None`.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use weft_core::Result;

use crate::{
	channel::{ReadCallback, ReadChannel, WriteChannel},
	stream::DataflowStream,
};

/// Read cursor presenting a stream as a channel of `Option<T>`.
///
/// Once the end-of-stream marker is read, every further `read` returns
/// `None` again without advancing.
pub struct StreamReadAdapter<T> {
	cursor: Mutex<Arc<DataflowStream<T>>>,
}

impl<T: Send + Clone + 'static> StreamReadAdapter<T> {
	pub fn new(stream: Arc<DataflowStream<T>>) -> Self {
		Self {
			cursor: Mutex::new(stream),
		}
	}
}

impl<T: Send + Clone + 'static> ReadChannel<Option<T>> for StreamReadAdapter<T> {
	fn read(&self) -> Option<T> {
		let cell = self.cursor.lock().clone();
		let value = cell.first();
		if value.is_some() {
			let mut cursor = self.cursor.lock();
			// Another reader of this adapter may have advanced already.
			if Arc::ptr_eq(&*cursor, &cell) {
				*cursor = cell.rest();
			}
		}
		value
	}

	fn read_timeout(&self, timeout: Duration) -> Option<Option<T>> {
		let cell = self.cursor.lock().clone();
		let value = cell.first_timeout(timeout)?;
		if value.is_some() {
			let mut cursor = self.cursor.lock();
			if Arc::ptr_eq(&*cursor, &cell) {
				*cursor = cell.rest();
			}
		}
		Some(value)
	}

	fn read_async(&self, callback: ReadCallback<Option<T>>) {
		// Claim the cell and advance eagerly so queued read_async calls
		// line up on successive cells in call order.
		let cell = {
			let mut cursor = self.cursor.lock();
			let cell = cursor.clone();
			*cursor = cell.rest();
			cell
		};
		cell.when_first_bound(callback);
	}
}

/// Write cursor appending into a stream through the channel trait.
///
/// Writing `None` closes the stream; later writes fail with `FLOW_001`.
pub struct StreamWriteAdapter<T> {
	cursor: Mutex<Arc<DataflowStream<T>>>,
}

impl<T: Send + Clone + 'static> StreamWriteAdapter<T> {
	pub fn new(stream: Arc<DataflowStream<T>>) -> Self {
		Self {
			cursor: Mutex::new(stream),
		}
	}
}

impl<T: Send + Clone + 'static> WriteChannel<Option<T>> for StreamWriteAdapter<T> {
	fn write(&self, value: Option<T>) -> Result<()> {
		let mut cursor = self.cursor.lock();
		match value {
			Some(value) => {
				let rest = cursor.push(value)?;
				*cursor = rest;
				Ok(())
			}
			None => cursor.close(),
		}
	}
}
