// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Automatic error capture on a [`Host`].
//!
//! Three independent channels are hooked:
//! - the synchronous error slot,
//! - the unhandled rejection slot,
//! - a capture-phase listener that picks up resource load failures.
//!
//! Each slot handler that was present before installation keeps being
//! called, and is put back on [`ErrorsIntegration::destroy`].

use std::fmt;
use std::sync::{Arc, Weak};

use loom_monitor_core::boundary::{self, contain};
use loom_monitor_core::{Dispatcher, Envelope, EnvelopeType, ErrorPayload, ErrorType};
use tracing::{debug, info, warn};

use crate::error::{MonitorSdkError, Result};
use crate::host::{
	ErrorEvent, ErrorHandler, EventTarget, Host, ListenerId, Reason, RejectionEvent,
	RejectionHandler, ScriptError,
};

/// Filter/transform applied right before a captured error is sent.
///
/// Returning `None` drops the report.
pub type BeforeSend = Arc<dyn Fn(ErrorPayload) -> Option<ErrorPayload> + Send + Sync>;

/// Tags whose load failures are reported as resource errors.
const RESOURCE_TAGS: &[&str] = &["img", "script", "link", "audio", "video", "source"];

const UNKNOWN_ERROR: &str = "Unknown error";
const UNKNOWN_REASON: &str = "Unknown rejection reason";

/// Options for [`ErrorsIntegration`]. Every channel is captured by default.
#[derive(Clone)]
pub struct ErrorsIntegrationOptions {
	pub capture_js_errors: bool,
	pub capture_unhandled_rejections: bool,
	pub capture_resource_errors: bool,
	pub before_send: Option<BeforeSend>,
}

impl Default for ErrorsIntegrationOptions {
	fn default() -> Self {
		Self {
			capture_js_errors: true,
			capture_unhandled_rejections: true,
			capture_resource_errors: true,
			before_send: None,
		}
	}
}

impl ErrorsIntegrationOptions {
	pub fn capture_js_errors(mut self, enabled: bool) -> Self {
		self.capture_js_errors = enabled;
		self
	}

	pub fn capture_unhandled_rejections(mut self, enabled: bool) -> Self {
		self.capture_unhandled_rejections = enabled;
		self
	}

	pub fn capture_resource_errors(mut self, enabled: bool) -> Self {
		self.capture_resource_errors = enabled;
		self
	}

	/// Sets the filter run on every captured error.
	///
	/// # Example
	///
	/// ```ignore
	/// let options = ErrorsIntegrationOptions::default().before_send(|payload| {
	///     if payload.message.contains("Script error") {
	///         return None;
	///     }
	///     Some(payload)
	/// });
	/// ```
	pub fn before_send<F>(mut self, filter: F) -> Self
	where
		F: Fn(ErrorPayload) -> Option<ErrorPayload> + Send + Sync + 'static,
	{
		self.before_send = Some(Arc::new(filter));
		self
	}
}

impl fmt::Debug for ErrorsIntegrationOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ErrorsIntegrationOptions")
			.field("capture_js_errors", &self.capture_js_errors)
			.field(
				"capture_unhandled_rejections",
				&self.capture_unhandled_rejections,
			)
			.field("capture_resource_errors", &self.capture_resource_errors)
			.field("before_send", &self.before_send.is_some())
			.finish()
	}
}

/// Shared reporting path for all channels.
struct Reporter {
	dispatcher: Dispatcher,
	before_send: Option<BeforeSend>,
}

impl Reporter {
	/// Filters, wraps and hands off a payload. Never fails outward.
	fn report(&self, payload: ErrorPayload) {
		let error_type = payload.error_type();

		let outcome = contain(|| {
			let payload = match &self.before_send {
				Some(filter) => filter(payload)?,
				None => payload,
			};
			let envelope = serde_json::to_value(&payload)
				.map(|value| Envelope::single(self.dispatcher.header(EnvelopeType::Event), value));
			Some(envelope)
		});

		match outcome {
			Some(Some(Ok(envelope))) => {
				contain(|| self.dispatcher.dispatch(envelope));
			}
			Some(Some(Err(e))) => warn!(%error_type, error = %e, "Dropped error report: not serializable"),
			Some(None) => debug!(%error_type, "Error report suppressed by before_send"),
			// The boundary already logged the panic.
			None => {}
		}
	}
}

/// What an install replaced, per channel. `None` means the channel was not
/// touched by this install.
#[derive(Default)]
struct Installed {
	on_error: Option<Option<ErrorHandler>>,
	on_unhandled_rejection: Option<Option<RejectionHandler>>,
	resource_listener: Option<ListenerId>,
}

/// Captures errors raised on a [`Host`] and reports them as `event` envelopes.
///
/// Lifecycle is `uninstalled -> installed -> uninstalled`. Dropping an
/// installed integration uninstalls it.
///
/// # Example
///
/// ```ignore
/// let host = Arc::new(Host::new("app://main"));
/// let mut errors = ErrorsIntegration::new(
///     dispatcher,
///     Arc::clone(&host),
///     ErrorsIntegrationOptions::default(),
/// );
/// errors.init()?;
/// // ...
/// errors.destroy();
/// ```
pub struct ErrorsIntegration {
	host: Arc<Host>,
	options: ErrorsIntegrationOptions,
	reporter: Arc<Reporter>,
	installed: Option<Installed>,
}

impl ErrorsIntegration {
	pub const NAME: &'static str = "ErrorsIntegration";

	pub fn new(dispatcher: Dispatcher, host: Arc<Host>, options: ErrorsIntegrationOptions) -> Self {
		let reporter = Arc::new(Reporter {
			dispatcher,
			before_send: options.before_send.clone(),
		});

		Self {
			host,
			options,
			reporter,
			installed: None,
		}
	}

	pub fn name(&self) -> &'static str {
		Self::NAME
	}

	pub fn is_installed(&self) -> bool {
		self.installed.is_some()
	}

	/// Hooks every enabled channel on the host.
	///
	/// Fails with [`MonitorSdkError::AlreadyInstalled`] if already installed;
	/// the existing install is left as is.
	pub fn init(&mut self) -> Result<()> {
		if self.installed.is_some() {
			return Err(MonitorSdkError::AlreadyInstalled);
		}

		let mut installed = Installed::default();

		if self.options.capture_js_errors {
			installed.on_error = Some(self.install_error_handler());
		}
		if self.options.capture_unhandled_rejections {
			installed.on_unhandled_rejection = Some(self.install_rejection_handler());
		}
		if self.options.capture_resource_errors {
			installed.resource_listener = Some(self.install_resource_listener());
		}

		self.installed = Some(installed);

		info!(
			integration = Self::NAME,
			js_errors = self.options.capture_js_errors,
			unhandled_rejections = self.options.capture_unhandled_rejections,
			resource_errors = self.options.capture_resource_errors,
			"Error capture installed"
		);
		Ok(())
	}

	/// Restores every channel this install touched. Safe to call at any time.
	pub fn destroy(&mut self) {
		let Some(installed) = self.installed.take() else {
			return;
		};

		if let Some(previous) = installed.on_error {
			self.host.set_on_error(previous);
		}
		if let Some(previous) = installed.on_unhandled_rejection {
			self.host.set_on_unhandled_rejection(previous);
		}
		if let Some(id) = installed.resource_listener {
			self.host.remove_capture_listener(id);
		}

		info!(integration = Self::NAME, "Error capture removed");
	}

	fn install_error_handler(&self) -> Option<ErrorHandler> {
		let previous = self.host.on_error();
		let chained = previous.clone();
		let reporter = Arc::clone(&self.reporter);
		let host = Arc::downgrade(&self.host);

		let handler: ErrorHandler = Arc::new(move |error: &ScriptError| {
			if let Some(payload) = contain(|| script_error_payload(error, &page_url(&host))) {
				reporter.report(payload);
			}

			match &chained {
				Some(original) => original(error),
				None => false,
			}
		});

		self.host.set_on_error(Some(handler));
		previous
	}

	fn install_rejection_handler(&self) -> Option<RejectionHandler> {
		let previous = self.host.on_unhandled_rejection();
		let chained = previous.clone();
		let reporter = Arc::clone(&self.reporter);
		let host = Arc::downgrade(&self.host);

		let handler: RejectionHandler = Arc::new(move |event: &RejectionEvent| {
			if let Some(payload) = contain(|| rejection_payload(&event.reason, &page_url(&host))) {
				reporter.report(payload);
			}

			if let Some(original) = &chained {
				original(event);
			}
		});

		self.host.set_on_unhandled_rejection(Some(handler));
		previous
	}

	fn install_resource_listener(&self) -> ListenerId {
		let reporter = Arc::clone(&self.reporter);
		let host = Arc::downgrade(&self.host);

		self.host.add_capture_listener(Arc::new(move |event: &ErrorEvent| {
			if let Some(Some(payload)) = contain(|| resource_error_payload(event, &page_url(&host))) {
				reporter.report(payload);
			}
		}))
	}
}

impl Drop for ErrorsIntegration {
	fn drop(&mut self) {
		self.destroy();
	}
}

impl fmt::Debug for ErrorsIntegration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ErrorsIntegration")
			.field("options", &self.options)
			.field("installed", &self.is_installed())
			.finish()
	}
}

fn page_url(host: &Weak<Host>) -> String {
	host.upgrade().map(|host| host.location()).unwrap_or_default()
}

fn non_empty(value: &str) -> Option<&str> {
	(!value.is_empty()).then_some(value)
}

fn script_error_payload(error: &ScriptError, page_url: &str) -> ErrorPayload {
	let event_message = error.message.as_deref().and_then(non_empty);

	let payload = match &error.error {
		Some(object) => ErrorPayload::new(
			ErrorType::JsError,
			non_empty(&object.name).unwrap_or("Error"),
			non_empty(&object.message)
				.or(event_message)
				.unwrap_or(UNKNOWN_ERROR),
			page_url,
		)
		.with_stack(object.stack.clone()),
		None => ErrorPayload::new(
			ErrorType::JsError,
			"Error",
			event_message.unwrap_or(UNKNOWN_ERROR),
			page_url,
		),
	};

	payload.with_location(error.source.clone(), error.lineno, error.colno)
}

fn rejection_payload(reason: &Reason, page_url: &str) -> ErrorPayload {
	let (name, stack) = match reason {
		Reason::Error(error) => (non_empty(&error.name), error.stack.clone()),
		Reason::Value(serde_json::Value::Object(map)) => (
			map.get("name").and_then(|v| v.as_str()).and_then(non_empty),
			map.get("stack").and_then(|v| v.as_str()).map(str::to_string),
		),
		_ => (None, None),
	};

	ErrorPayload::new(
		ErrorType::UnhandledRejection,
		name.unwrap_or("UnhandledRejection"),
		rejection_message(reason),
		page_url,
	)
	.with_stack(stack)
}

/// Message for a rejection reason of unknown shape.
///
/// Error-like values give their message, strings are used as-is, anything
/// else (including an object with an empty `message`) is rendered
/// generically, falling back to a fixed text.
pub(crate) fn rejection_message(reason: &Reason) -> String {
	match reason {
		Reason::Error(error) => error.message.clone(),
		Reason::Text(text) => text.clone(),
		Reason::Value(serde_json::Value::String(text)) => text.clone(),
		Reason::Value(value) => match value
			.get("message")
			.and_then(|m| m.as_str())
			.and_then(non_empty)
		{
			Some(message) => message.to_string(),
			None => serde_json::to_string(value).unwrap_or_else(|_| UNKNOWN_REASON.to_string()),
		},
		Reason::Opaque(value) => {
			if let Some(text) = value.downcast_ref::<&str>() {
				text.to_string()
			} else if let Some(text) = value.downcast_ref::<String>() {
				text.clone()
			} else {
				UNKNOWN_REASON.to_string()
			}
		}
	}
}

fn resource_error_payload(event: &ErrorEvent, page_url: &str) -> Option<ErrorPayload> {
	let Some(EventTarget::Element(element)) = &event.target else {
		return None;
	};

	let tag = element.tag_name().to_ascii_lowercase();
	if !RESOURCE_TAGS.contains(&tag.as_str()) {
		return None;
	}

	let url = element
		.attribute("src")
		.or_else(|| element.attribute("href"))
		.unwrap_or_default()
		.to_string();

	Some(
		ErrorPayload::new(
			ErrorType::ResourceError,
			"ResourceLoadError",
			format!("Failed to load {tag}: {url}"),
			page_url,
		)
		.with_location(Some(url), None, None),
	)
}

/// Whether a panic on this thread should be skipped by capture hooks:
/// it came from the reporter itself or from a handler already delivering
/// an error.
pub(crate) fn should_skip_capture() -> bool {
	boundary::is_active() || Host::is_dispatching()
}
