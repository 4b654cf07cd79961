// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Failure boundary around the reporting path.
//!
//! Anything that runs while reporting (user filters, serialization, a
//! transport's `send`) executes inside a boundary: panics are caught and
//! downgraded to "drop and continue", and [`is_active`] lets capture hooks
//! recognise that a failure originated from the reporter itself so it is not
//! captured again.

use std::any::Any;
use std::cell::Cell;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::CatchUnwind;
use futures::FutureExt;
use pin_project_lite::pin_project;
use tracing::warn;

thread_local! {
	static IN_BOUNDARY: Cell<bool> = const { Cell::new(false) };
}

/// Returns true while the current thread is executing reporting code.
pub fn is_active() -> bool {
	IN_BOUNDARY.with(Cell::get)
}

struct Enter {
	previous: bool,
}

impl Enter {
	fn new() -> Self {
		Self {
			previous: IN_BOUNDARY.with(|flag| flag.replace(true)),
		}
	}
}

impl Drop for Enter {
	fn drop(&mut self) {
		IN_BOUNDARY.with(|flag| flag.set(self.previous));
	}
}

/// Runs `f` inside the boundary, returning `None` if it panicked.
pub fn contain<R>(f: impl FnOnce() -> R) -> Option<R> {
	let _enter = Enter::new();
	match catch_unwind(AssertUnwindSafe(f)) {
		Ok(value) => Some(value),
		Err(payload) => {
			warn!(panic = %panic_message(payload.as_ref()), "Contained panic on reporting path");
			None
		}
	}
}

pin_project! {
	/// Future adapter produced by [`contain_future`].
	#[must_use = "futures do nothing unless polled"]
	pub struct Contained<F> {
		#[pin]
		inner: CatchUnwind<AssertUnwindSafe<F>>,
	}
}

/// Wraps a future so every poll runs inside the boundary.
pub fn contain_future<F: Future>(future: F) -> Contained<F> {
	Contained {
		inner: AssertUnwindSafe(future).catch_unwind(),
	}
}

impl<F: Future> Future for Contained<F> {
	type Output = Option<F::Output>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let _enter = Enter::new();
		match self.project().inner.poll(cx) {
			Poll::Ready(Ok(value)) => Poll::Ready(Some(value)),
			Poll::Ready(Err(payload)) => {
				warn!(panic = %panic_message(payload.as_ref()), "Contained panic on reporting path");
				Poll::Ready(None)
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}
