// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic capture. Panic hooks are process-global, so everything touching
//! them lives in this one test, run phase by phase.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use loom_monitor::{
	Envelope, Host, MonitorClient, ScriptError, Transport, TransportResponse, PANIC_ERROR_NAME,
};

#[derive(Default)]
struct RecordingTransport {
	sent: Mutex<Vec<Envelope>>,
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
	async fn send(&self, envelope: Envelope) -> TransportResponse {
		self.sent.lock().unwrap().push(envelope);
		TransportResponse::new(200)
	}
}

struct PanickingTransport {
	calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Transport for PanickingTransport {
	async fn send(&self, _envelope: Envelope) -> TransportResponse {
		self.calls.fetch_add(1, Ordering::SeqCst);
		panic!("collector client exploded");
	}
}

#[tokio::test]
async fn test_panics_are_reported_once_and_never_fed_back() {
	let previous_calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&previous_calls);
	std::panic::set_hook(Box::new(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	}));

	let host = Arc::new(Host::new("app://main"));
	let transport = Arc::new(RecordingTransport::default());
	let client = MonitorClient::builder()
		.dsn("app_123")
		.host(Arc::clone(&host))
		.transport(transport.clone())
		.capture_panics(true)
		.build()
		.unwrap();

	let result = std::panic::catch_unwind(|| panic!("worker crashed"));
	assert!(result.is_err());
	assert!(client.flush(None).await);

	{
		let sent = transport.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		let payload = &sent[0].items()[0].payload;
		assert_eq!(payload["errorType"], "js_error");
		assert_eq!(payload["name"], PANIC_ERROR_NAME);
		assert_eq!(payload["message"], "worker crashed");
		assert!(payload["filename"].as_str().unwrap().ends_with("panic_bridge.rs"));
	}
	assert_eq!(previous_calls.load(Ordering::SeqCst), 1);

	assert!(client.shutdown(None).await);

	assert!(host.on_error().is_none());

	let result = std::panic::catch_unwind(|| panic!("after shutdown"));
	assert!(result.is_err());
	assert_eq!(transport.sent.lock().unwrap().len(), 1);
	assert_eq!(previous_calls.load(Ordering::SeqCst), 2);

	// A transport that panics while sending must not come back as a new
	// error on the host.
	let host = Arc::new(Host::new("app://main"));
	let host_errors = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&host_errors);
	host.set_on_error(Some(Arc::new(move |_: &ScriptError| {
		counter.fetch_add(1, Ordering::SeqCst);
		false
	})));
	let transport = Arc::new(PanickingTransport {
		calls: AtomicUsize::new(0),
	});
	let client = MonitorClient::builder()
		.dsn("app_123")
		.host(Arc::clone(&host))
		.transport(transport.clone())
		.capture_panics(true)
		.build()
		.unwrap();

	host.dispatch_rejection("connection reset");
	assert!(client.flush(None).await);

	assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
	assert_eq!(host_errors.load(Ordering::SeqCst), 0);
	assert_eq!(previous_calls.load(Ordering::SeqCst), 3);

	assert!(client.shutdown(None).await);
	drop(std::panic::take_hook());
}
