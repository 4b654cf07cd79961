// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: Capture host errors and report events with the loom-monitor SDK.
//!
//! Run with:
//!   cargo run --example capture -p loom-monitor
//!
//! Point it at a collector with `LOOM_MONITOR_BASE_URL` and `LOOM_MONITOR_DSN`.

use std::sync::Arc;
use std::time::Duration;

use loom_monitor::{
	Element, ErrorsIntegrationOptions, Host, HostError, MonitorClient, MonitoringClient,
	ScriptError, DEFAULT_BASE_URL,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loom_monitor=debug")),
		)
		.init();

	let base_url =
		std::env::var("LOOM_MONITOR_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
	let dsn = std::env::var("LOOM_MONITOR_DSN").unwrap_or_else(|_| "example_app".to_string());

	println!("Initializing monitor client...");
	println!("  Base URL: {}", base_url);
	println!("  DSN: {}", dsn);

	let host = Arc::new(Host::new("app://example/home"));

	// The host already has its own error handler; it keeps running.
	host.set_on_error(Some(Arc::new(|error: &ScriptError| {
		println!("  app handler saw: {:?}", error.message);
		false
	})));

	let client = MonitorClient::builder()
		.dsn(&dsn)
		.host(Arc::clone(&host))
		.base_url(&base_url)
		.request_timeout(Duration::from_secs(5))
		.errors(ErrorsIntegrationOptions::default().before_send(|payload| {
			// Drop cross-origin noise.
			if payload.message == "Script error." {
				return None;
			}
			Some(payload)
		}))
		.build()?;

	client.report_message("example started");
	client.report_event(&serde_json::json!({
		"name": "checkout",
		"items": 3,
		"total_cents": 4599,
	}));

	println!("Raising a script error...");
	host.dispatch_error(
		ScriptError::new("Uncaught TypeError: cart is undefined")
			.with_location("app://example/cart.js", 42, 7)
			.with_error(HostError::new("TypeError", "cart is undefined")),
	);

	println!("Raising a filtered script error...");
	host.dispatch_error(ScriptError::new("Script error."));

	println!("Raising an unhandled rejection...");
	host.dispatch_rejection(HostError::new("NetworkError", "connection reset"));

	println!("Raising a resource load failure...");
	host.dispatch_resource_error(Element::new("img").with_attribute("src", "app://example/logo.png"));

	let drained = client.shutdown(Some(Duration::from_secs(10))).await;
	println!("Shutdown complete (drained: {drained})");

	Ok(())
}
