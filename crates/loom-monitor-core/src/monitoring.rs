// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The facade a host application holds on to.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::boundary::contain;
use crate::dispatch::Dispatcher;
use crate::envelope::{Envelope, EnvelopeType};
use crate::error::{MonitorError, Result};
use crate::transport::Transport;

/// Host-facing write surface of the SDK.
pub trait MonitoringClient {
	/// Reports a plain message, e.g. a click or page-view tracking point.
	fn report_message(&self, message: &str);

	/// Reports a structured event: measurements, business events, custom errors.
	fn report_event<T: Serialize + ?Sized>(&self, event: &T);
}

/// Options for [`Monitoring`].
#[derive(Debug, Clone, Default)]
pub struct MonitoringOptions {
	/// Version stamped into every envelope header.
	pub sdk_version: Option<String>,
}

#[derive(Serialize)]
struct MessagePayload<'a> {
	message: &'a str,
}

#[derive(Serialize)]
struct EventPayload<'a, T: ?Sized> {
	event: &'a T,
}

/// Owns the transport and builds envelopes for manual reports.
///
/// Reporting before [`Monitoring::init`] is a silent no-op so host code can
/// call it at any point of the SDK lifecycle.
pub struct Monitoring {
	options: MonitoringOptions,
	dispatcher: OnceLock<Dispatcher>,
}

impl Monitoring {
	pub fn new(options: MonitoringOptions) -> Self {
		Self {
			options,
			dispatcher: OnceLock::new(),
		}
	}

	/// Sets the transport, using the current Tokio runtime for deliveries.
	///
	/// Returns the dispatcher so capture integrations can share it.
	pub fn init(&self, transport: Arc<dyn Transport>) -> Result<&Dispatcher> {
		if self.is_initialized() {
			return Err(MonitorError::TransportAlreadySet);
		}
		let runtime = Handle::try_current()?;
		self.init_with_runtime(transport, runtime)
	}

	/// Sets the transport, delivering on `runtime`.
	pub fn init_with_runtime(
		&self,
		transport: Arc<dyn Transport>,
		runtime: Handle,
	) -> Result<&Dispatcher> {
		let dispatcher =
			Dispatcher::new(transport, runtime).with_sdk_version(self.options.sdk_version.clone());
		self
			.dispatcher
			.set(dispatcher)
			.map_err(|_| MonitorError::TransportAlreadySet)?;

		info!(sdk_version = ?self.options.sdk_version, "Monitoring initialized");
		self.dispatcher.get().ok_or(MonitorError::TransportAlreadySet)
	}

	pub fn is_initialized(&self) -> bool {
		self.dispatcher.get().is_some()
	}

	/// Delivery path shared with capture integrations.
	pub fn dispatcher(&self) -> Option<&Dispatcher> {
		self.dispatcher.get()
	}

	/// Waits for in-flight reports; true if everything drained in time.
	pub async fn flush(&self, timeout: Option<Duration>) -> bool {
		match self.dispatcher.get() {
			Some(dispatcher) => dispatcher.flush(timeout).await,
			None => true,
		}
	}

	fn report<P: Serialize>(&self, envelope_type: EnvelopeType, payload: P) {
		let Some(dispatcher) = self.dispatcher.get() else {
			return;
		};

		let built = contain(|| {
			serde_json::to_value(payload).map(|value| Envelope::single(dispatcher.header(envelope_type), value))
		});

		match built {
			Some(Ok(envelope)) => dispatcher.dispatch(envelope),
			Some(Err(e)) => warn!(%envelope_type, error = %e, "Dropped report: payload not serializable"),
			None => {}
		}
	}
}

impl MonitoringClient for Monitoring {
	fn report_message(&self, message: &str) {
		self.report(EnvelopeType::Message, MessagePayload { message });
	}

	fn report_event<T: Serialize + ?Sized>(&self, event: &T) {
		self.report(EnvelopeType::Event, EventPayload { event });
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::TransportResponse;
	use proptest::prelude::*;
	use serde_json::json;
	use std::collections::BTreeMap;
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingTransport {
		sent: Mutex<Vec<Envelope>>,
	}

	impl RecordingTransport {
		fn sent(&self) -> Vec<Envelope> {
			self.sent.lock().unwrap().clone()
		}
	}

	#[async_trait::async_trait]
	impl Transport for RecordingTransport {
		async fn send(&self, envelope: Envelope) -> TransportResponse {
			self.sent.lock().unwrap().push(envelope);
			TransportResponse::new(200)
		}
	}

	struct Unserializable;

	impl Serialize for Unserializable {
		fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
			Err(serde::ser::Error::custom("not today"))
		}
	}

	#[test]
	fn test_report_before_init_is_noop() {
		let monitoring = Monitoring::new(MonitoringOptions::default());
		monitoring.report_message("early");
		monitoring.report_event(&json!({"k": "v"}));
		assert!(!monitoring.is_initialized());
	}

	#[test]
	fn test_init_without_runtime_fails() {
		let monitoring = Monitoring::new(MonitoringOptions::default());
		let result = monitoring.init(Arc::new(RecordingTransport::default()));
		assert!(matches!(result, Err(MonitorError::NoRuntime(_))));
		assert!(!monitoring.is_initialized());
	}

	#[tokio::test]
	async fn test_second_init_is_rejected() {
		let first = Arc::new(RecordingTransport::default());
		let monitoring = Monitoring::new(MonitoringOptions::default());
		monitoring.init(first.clone()).unwrap();

		let result = monitoring.init(Arc::new(RecordingTransport::default()));
		assert!(matches!(result, Err(MonitorError::TransportAlreadySet)));

		monitoring.report_message("still first");
		assert!(monitoring.flush(None).await);
		assert_eq!(first.sent().len(), 1);
	}

	#[tokio::test]
	async fn test_report_message_envelope() {
		let transport = Arc::new(RecordingTransport::default());
		let monitoring = Monitoring::new(MonitoringOptions {
			sdk_version: Some("0.1.0".to_string()),
		});
		monitoring.init(transport.clone()).unwrap();

		monitoring.report_message("page view");
		assert!(monitoring.flush(None).await);

		let sent = transport.sent();
		assert_eq!(sent.len(), 1);
		let value = serde_json::to_value(&sent[0]).unwrap();
		assert_eq!(value["header"]["type"], "message");
		assert_eq!(value["header"]["sdk_version"], "0.1.0");
		assert_eq!(
			value["items"],
			json!([{"type": "message", "payload": {"message": "page view"}}])
		);
	}

	#[tokio::test]
	async fn test_unserializable_event_is_dropped() {
		let transport = Arc::new(RecordingTransport::default());
		let monitoring = Monitoring::new(MonitoringOptions::default());
		monitoring.init(transport.clone()).unwrap();

		monitoring.report_event(&Unserializable);
		assert!(monitoring.flush(None).await);

		assert!(transport.sent().is_empty());
	}

	#[tokio::test]
	async fn test_flush_before_init_is_true() {
		let monitoring = Monitoring::new(MonitoringOptions::default());
		assert!(monitoring.flush(Some(Duration::from_millis(1))).await);
	}

	fn arb_json() -> impl Strategy<Value = serde_json::Value> {
		let leaf = prop_oneof![
			Just(serde_json::Value::Null),
			any::<bool>().prop_map(serde_json::Value::from),
			any::<i64>().prop_map(serde_json::Value::from),
			".*".prop_map(serde_json::Value::from),
		];
		leaf.prop_recursive(3, 16, 4, |inner| {
			prop_oneof![
				prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
				prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
					.prop_map(|m: BTreeMap<String, serde_json::Value>| json!(m)),
			]
		})
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(32))]

		#[test]
		fn report_event_sends_exactly_one_envelope(payload in arb_json()) {
			let runtime = tokio::runtime::Builder::new_current_thread()
				.enable_all()
				.build()
				.unwrap();
			let transport = Arc::new(RecordingTransport::default());
			let monitoring = Monitoring::new(MonitoringOptions::default());
			monitoring
				.init_with_runtime(transport.clone(), runtime.handle().clone())
				.unwrap();

			monitoring.report_event(&payload);
			prop_assert!(runtime.block_on(monitoring.flush(None)));

			let sent = transport.sent();
			prop_assert_eq!(sent.len(), 1);
			prop_assert_eq!(sent[0].envelope_type(), EnvelopeType::Event);
			prop_assert_eq!(sent[0].len(), 1);
			prop_assert_eq!(sent[0].items()[0].item_type, EnvelopeType::Event);
			prop_assert_eq!(&sent[0].items()[0].payload, &json!({"event": payload}));
		}
	}
}
