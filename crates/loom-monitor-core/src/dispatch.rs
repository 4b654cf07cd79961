// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fire-and-forget delivery of envelopes to a transport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::boundary::contain_future;
use crate::envelope::{Envelope, EnvelopeHeader, EnvelopeType};
use crate::transport::Transport;

/// Hands envelopes to a transport without waiting on the network.
///
/// Each envelope is sent on its own task on the captured runtime. Sends run
/// inside the reporting boundary, their responses are logged and discarded,
/// and completion order is not guaranteed.
#[derive(Clone)]
pub struct Dispatcher {
	transport: Arc<dyn Transport>,
	runtime: Handle,
	tracker: TaskTracker,
	sdk_version: Option<String>,
}

impl Dispatcher {
	pub fn new(transport: Arc<dyn Transport>, runtime: Handle) -> Self {
		Self {
			transport,
			runtime,
			tracker: TaskTracker::new(),
			sdk_version: None,
		}
	}

	/// Stamps `version` into every header built by [`Dispatcher::header`].
	pub fn with_sdk_version(mut self, version: Option<String>) -> Self {
		self.sdk_version = version;
		self
	}

	/// Creates a header for a new envelope, carrying the SDK version if set.
	pub fn header(&self, envelope_type: EnvelopeType) -> EnvelopeHeader {
		let header = EnvelopeHeader::new(envelope_type);
		match &self.sdk_version {
			Some(version) => header.with_sdk_version(version.clone()),
			None => header,
		}
	}

	/// Starts sending `envelope` and returns immediately.
	pub fn dispatch(&self, envelope: Envelope) {
		let transport = Arc::clone(&self.transport);
		let envelope_type = envelope.envelope_type();
		let items = envelope.len();

		self.tracker.spawn_on(
			contain_future(async move {
				let response = transport.send(envelope).await;
				if response.is_success() {
					debug!(
						%envelope_type,
						items,
						status = response.status_code,
						"Envelope delivered"
					);
				} else if response.is_transport_failure() {
					warn!(%envelope_type, items, "Envelope dropped: no response from collector");
				} else {
					warn!(
						%envelope_type,
						items,
						status = response.status_code,
						"Envelope rejected by collector"
					);
				}
			}),
			&self.runtime,
		);
	}

	/// Number of sends still in flight.
	pub fn in_flight(&self) -> usize {
		self.tracker.len()
	}

	/// Waits for in-flight sends, then flushes the transport.
	///
	/// Returns false if `timeout` elapsed first. `None` waits indefinitely.
	pub async fn flush(&self, timeout: Option<Duration>) -> bool {
		let started = Instant::now();

		self.tracker.close();
		let drained = match timeout {
			Some(limit) => tokio::time::timeout(limit, self.tracker.wait())
				.await
				.is_ok(),
			None => {
				self.tracker.wait().await;
				true
			}
		};
		self.tracker.reopen();

		if !drained {
			debug!(in_flight = self.tracker.len(), "Flush timed out waiting for sends");
			return false;
		}

		let remaining = timeout.map(|limit| limit.saturating_sub(started.elapsed()));
		contain_future(self.transport.flush(remaining))
			.await
			.unwrap_or(false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::envelope::create_envelope;
	use crate::transport::TransportResponse;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	struct MockTransport {
		sent: Mutex<Vec<Envelope>>,
		delay: Duration,
		status: u16,
	}

	impl MockTransport {
		fn new(status: u16, delay: Duration) -> Self {
			Self {
				sent: Mutex::new(Vec::new()),
				delay,
				status,
			}
		}
	}

	#[async_trait::async_trait]
	impl Transport for MockTransport {
		async fn send(&self, envelope: Envelope) -> TransportResponse {
			tokio::time::sleep(self.delay).await;
			self.sent.lock().unwrap().push(envelope);
			TransportResponse::new(self.status)
		}
	}

	struct PanickingTransport {
		attempts: AtomicUsize,
	}

	#[async_trait::async_trait]
	impl Transport for PanickingTransport {
		async fn send(&self, _envelope: Envelope) -> TransportResponse {
			self.attempts.fetch_add(1, Ordering::SeqCst);
			panic!("transport exploded");
		}
	}

	fn envelope() -> Envelope {
		create_envelope(EnvelopeType::Event, serde_json::json!({"n": 1}))
	}

	#[tokio::test]
	async fn test_dispatch_then_flush_delivers() {
		let transport = Arc::new(MockTransport::new(200, Duration::from_millis(5)));
		let dispatcher = Dispatcher::new(transport.clone(), Handle::current());

		dispatcher.dispatch(envelope());
		dispatcher.dispatch(envelope());

		assert!(dispatcher.flush(None).await);
		assert_eq!(transport.sent.lock().unwrap().len(), 2);
		assert_eq!(dispatcher.in_flight(), 0);
	}

	#[tokio::test]
	async fn test_rejected_status_is_discarded() {
		let transport = Arc::new(MockTransport::new(500, Duration::ZERO));
		let dispatcher = Dispatcher::new(transport.clone(), Handle::current());

		dispatcher.dispatch(envelope());

		assert!(dispatcher.flush(None).await);
		assert_eq!(transport.sent.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_flush_times_out() {
		let transport = Arc::new(MockTransport::new(200, Duration::from_secs(5)));
		let dispatcher = Dispatcher::new(transport, Handle::current());

		dispatcher.dispatch(envelope());

		assert!(!dispatcher.flush(Some(Duration::from_millis(20))).await);
		assert_eq!(dispatcher.in_flight(), 1);
	}

	#[tokio::test]
	async fn test_dispatch_usable_after_flush() {
		let transport = Arc::new(MockTransport::new(200, Duration::ZERO));
		let dispatcher = Dispatcher::new(transport.clone(), Handle::current());

		dispatcher.dispatch(envelope());
		assert!(dispatcher.flush(None).await);
		dispatcher.dispatch(envelope());
		assert!(dispatcher.flush(None).await);

		assert_eq!(transport.sent.lock().unwrap().len(), 2);
	}

	#[tokio::test]
	async fn test_panicking_transport_is_contained() {
		let transport = Arc::new(PanickingTransport {
			attempts: AtomicUsize::new(0),
		});
		let dispatcher = Dispatcher::new(transport.clone(), Handle::current());

		dispatcher.dispatch(envelope());

		assert!(dispatcher.flush(None).await);
		assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_header_carries_sdk_version() {
		let dispatcher = Dispatcher::new(Arc::new(crate::NoopTransport), Handle::current())
			.with_sdk_version(Some("0.3.0".to_string()));

		let header = dispatcher.header(EnvelopeType::Message);
		assert_eq!(header.sdk_version.as_deref(), Some("0.3.0"));
		assert_eq!(header.envelope_type, EnvelopeType::Message);
	}
}
