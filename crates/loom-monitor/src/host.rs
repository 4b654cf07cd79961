// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host error channels as an explicit, shared state object.
//!
//! A [`Host`] owns the three places a runtime reports failures:
//! - a single synchronous error slot (`on_error`),
//! - a single unhandled rejection slot (`on_unhandled_rejection`),
//! - any number of capture-phase error listeners, which see every error
//!   event before the slot handlers do.
//!
//! Slots hold at most one handler; whoever installs a handler is responsible
//! for chaining to the one it replaced.

use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Synchronous error handler. Returning `true` marks the error as handled.
pub type ErrorHandler = Arc<dyn Fn(&ScriptError) -> bool + Send + Sync>;

/// Handler for async failures nobody awaited.
pub type RejectionHandler = Arc<dyn Fn(&RejectionEvent) + Send + Sync>;

/// Capture-phase listener for error events.
pub type CaptureListener = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;

thread_local! {
	static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// An error object as seen by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostError {
	pub name: String,
	pub message: String,
	pub stack: Option<String>,
}

impl HostError {
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
			stack: None,
		}
	}

	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}

	/// Converts a Rust error, naming it after its type.
	pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
		let type_name = std::any::type_name::<E>();
		let name = type_name
			.split('<')
			.next()
			.and_then(|path| path.rsplit("::").next())
			.unwrap_or(type_name);
		Self::new(name, error.to_string())
	}
}

/// A synchronous error delivered through the `on_error` slot.
///
/// Fields are positional data the runtime may or may not know.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptError {
	pub message: Option<String>,
	pub source: Option<String>,
	pub lineno: Option<u32>,
	pub colno: Option<u32>,
	pub error: Option<HostError>,
}

impl ScriptError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: Some(message.into()),
			..Default::default()
		}
	}

	pub fn with_location(mut self, source: impl Into<String>, lineno: u32, colno: u32) -> Self {
		self.source = Some(source.into());
		self.lineno = Some(lineno);
		self.colno = Some(colno);
		self
	}

	pub fn with_error(mut self, error: HostError) -> Self {
		self.error = Some(error);
		self
	}
}

/// Why an async operation failed. The shape is not known in advance.
pub enum Reason {
	Error(HostError),
	Text(String),
	Value(serde_json::Value),
	Opaque(Box<dyn Any + Send + Sync>),
}

impl fmt::Debug for Reason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Reason::Error(e) => f.debug_tuple("Error").field(e).finish(),
			Reason::Text(s) => f.debug_tuple("Text").field(s).finish(),
			Reason::Value(v) => f.debug_tuple("Value").field(v).finish(),
			Reason::Opaque(_) => f.write_str("Opaque(..)"),
		}
	}
}

impl From<HostError> for Reason {
	fn from(error: HostError) -> Self {
		Reason::Error(error)
	}
}

impl From<&str> for Reason {
	fn from(text: &str) -> Self {
		Reason::Text(text.to_string())
	}
}

impl From<String> for Reason {
	fn from(text: String) -> Self {
		Reason::Text(text)
	}
}

impl From<serde_json::Value> for Reason {
	fn from(value: serde_json::Value) -> Self {
		Reason::Value(value)
	}
}

/// An unhandled rejection delivered through the `on_unhandled_rejection` slot.
#[derive(Debug)]
pub struct RejectionEvent {
	pub reason: Reason,
}

/// A markup element that can be the target of an error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
	tag_name: String,
	attributes: HashMap<String, String>,
}

impl Element {
	pub fn new(tag_name: impl Into<String>) -> Self {
		Self {
			tag_name: tag_name.into(),
			attributes: HashMap::new(),
		}
	}

	pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	pub fn tag_name(&self) -> &str {
		&self.tag_name
	}

	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).map(String::as_str)
	}
}

/// Where an error event was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
	/// The global scope; script errors are raised here.
	Window,
	Element(Element),
}

/// Event seen by capture-phase listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
	pub target: Option<EventTarget>,
	pub message: Option<String>,
}

/// Identifies a capture listener for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct HostState {
	location: String,
	on_error: Option<ErrorHandler>,
	on_unhandled_rejection: Option<RejectionHandler>,
	capture_listeners: Vec<(ListenerId, CaptureListener)>,
	next_listener: u64,
}

/// The host runtime's error channels and current page URL.
///
/// Handlers are cloned out of the lock before being invoked, so a handler
/// may read or replace slots on the same host.
pub struct Host {
	state: Mutex<HostState>,
}

struct Dispatching {
	previous: bool,
}

impl Dispatching {
	fn enter() -> Self {
		Self {
			previous: DISPATCHING.with(|flag| flag.replace(true)),
		}
	}
}

impl Drop for Dispatching {
	fn drop(&mut self) {
		DISPATCHING.with(|flag| flag.set(self.previous));
	}
}

impl Host {
	pub fn new(location: impl Into<String>) -> Self {
		Self {
			state: Mutex::new(HostState {
				location: location.into(),
				..Default::default()
			}),
		}
	}

	fn state(&self) -> MutexGuard<'_, HostState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// True while this thread is delivering an error event to handlers.
	pub fn is_dispatching() -> bool {
		DISPATCHING.with(Cell::get)
	}

	pub fn location(&self) -> String {
		self.state().location.clone()
	}

	pub fn set_location(&self, location: impl Into<String>) {
		self.state().location = location.into();
	}

	pub fn on_error(&self) -> Option<ErrorHandler> {
		self.state().on_error.clone()
	}

	/// Replaces the synchronous error handler, returning the previous one.
	pub fn set_on_error(&self, handler: Option<ErrorHandler>) -> Option<ErrorHandler> {
		std::mem::replace(&mut self.state().on_error, handler)
	}

	pub fn on_unhandled_rejection(&self) -> Option<RejectionHandler> {
		self.state().on_unhandled_rejection.clone()
	}

	/// Replaces the rejection handler, returning the previous one.
	pub fn set_on_unhandled_rejection(
		&self,
		handler: Option<RejectionHandler>,
	) -> Option<RejectionHandler> {
		std::mem::replace(&mut self.state().on_unhandled_rejection, handler)
	}

	pub fn add_capture_listener(&self, listener: CaptureListener) -> ListenerId {
		let mut state = self.state();
		let id = ListenerId(state.next_listener);
		state.next_listener += 1;
		state.capture_listeners.push((id, listener));
		id
	}

	/// Removes a capture listener; false if it was not registered.
	pub fn remove_capture_listener(&self, id: ListenerId) -> bool {
		let mut state = self.state();
		let before = state.capture_listeners.len();
		state.capture_listeners.retain(|(existing, _)| *existing != id);
		state.capture_listeners.len() != before
	}

	pub fn capture_listener_count(&self) -> usize {
		self.state().capture_listeners.len()
	}

	fn capture_listeners(&self) -> Vec<CaptureListener> {
		self
			.state()
			.capture_listeners
			.iter()
			.map(|(_, listener)| Arc::clone(listener))
			.collect()
	}

	/// Raises a synchronous error.
	///
	/// Capture listeners see it first (targeted at the window), then the
	/// `on_error` handler. Returns whether the handler marked it handled.
	pub fn dispatch_error(&self, error: ScriptError) -> bool {
		let _dispatching = Dispatching::enter();

		let event = ErrorEvent {
			target: Some(EventTarget::Window),
			message: error.message.clone(),
		};
		for listener in self.capture_listeners() {
			listener(&event);
		}

		match self.on_error() {
			Some(handler) => handler(&error),
			None => false,
		}
	}

	/// Raises an unhandled rejection.
	pub fn dispatch_rejection(&self, reason: impl Into<Reason>) {
		let _dispatching = Dispatching::enter();

		let event = RejectionEvent {
			reason: reason.into(),
		};
		if let Some(handler) = self.on_unhandled_rejection() {
			handler(&event);
		}
	}

	/// Raises a load failure on `element`. Only capture listeners see it.
	pub fn dispatch_resource_error(&self, element: Element) {
		let _dispatching = Dispatching::enter();

		let event = ErrorEvent {
			target: Some(EventTarget::Element(element)),
			message: None,
		};
		for listener in self.capture_listeners() {
			listener(&event);
		}
	}
}

impl fmt::Debug for Host {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state();
		f.debug_struct("Host")
			.field("location", &state.location)
			.field("on_error", &state.on_error.is_some())
			.field(
				"on_unhandled_rejection",
				&state.on_unhandled_rejection.is_some(),
			)
			.field("capture_listeners", &state.capture_listeners.len())
			.finish()
	}
}
