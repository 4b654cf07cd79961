// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Forwards process panics into a host's synchronous error channel.

use std::panic::PanicHookInfo;
use std::sync::{Arc, Weak};

use loom_monitor_core::boundary::panic_message;
use tracing::info;

use crate::host::{Host, HostError, ScriptError};
use crate::integrations::errors::should_skip_capture;
use crate::stack::capture_stack;

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Name given to errors produced from panics.
pub const PANIC_ERROR_NAME: &str = "panic";

/// Chains the process panic hook onto a [`Host`].
///
/// Each panic becomes a [`ScriptError`] dispatched on the host, then the
/// previous hook runs as before. Panics raised by the reporting path itself,
/// or by a handler already delivering an error, are passed straight to the
/// previous hook.
///
/// The previous hook is restored by [`PanicBridge::uninstall`] or on drop.
/// Panic hooks are process-global: installing two bridges at once, or
/// setting a hook while one is installed, loses the later restore.
pub struct PanicBridge {
	previous: Option<Arc<PanicHook>>,
}

impl PanicBridge {
	/// Installs the bridge. Must not be called while panicking.
	pub fn install(host: &Arc<Host>) -> Self {
		let previous: Arc<PanicHook> = Arc::new(std::panic::take_hook());
		let chained = Arc::clone(&previous);
		let host = Arc::downgrade(host);

		std::panic::set_hook(Box::new(move |info| {
			report_panic(&host, info);
			chained(info);
		}));

		info!("Panic hook installed");
		Self {
			previous: Some(previous),
		}
	}

	/// Puts the previous hook back.
	pub fn uninstall(mut self) {
		self.restore();
	}

	fn restore(&mut self) {
		let Some(previous) = self.previous.take() else {
			return;
		};

		// Dropping our hook releases its handle on `previous`.
		drop(std::panic::take_hook());
		match Arc::try_unwrap(previous) {
			Ok(hook) => std::panic::set_hook(hook),
			Err(shared) => std::panic::set_hook(Box::new(move |info| shared(info))),
		}

		info!("Panic hook removed");
	}
}

impl Drop for PanicBridge {
	fn drop(&mut self) {
		if !std::thread::panicking() {
			self.restore();
		}
	}
}

fn report_panic(host: &Weak<Host>, info: &PanicHookInfo<'_>) {
	if should_skip_capture() {
		return;
	}
	let Some(host) = host.upgrade() else {
		return;
	};

	host.dispatch_error(script_error_from_panic(info));
}

fn script_error_from_panic(info: &PanicHookInfo<'_>) -> ScriptError {
	let message = panic_message(info.payload());

	let mut error = HostError::new(PANIC_ERROR_NAME, message.clone());
	error.stack = capture_stack();

	let mut script_error = ScriptError::new(message).with_error(error);
	if let Some(location) = info.location() {
		script_error = script_error.with_location(location.file(), location.line(), location.column());
	}
	script_error
}
