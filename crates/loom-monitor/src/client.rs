// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SDK entry point: builds the transport, the facade and the error capture.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use loom_monitor_core::{Monitoring, MonitoringClient, MonitoringOptions, Transport};
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::error::{MonitorSdkError, Result};
use crate::host::Host;
use crate::http::SDK_VERSION;
use crate::integrations::{ErrorsIntegration, ErrorsIntegrationOptions};
use crate::panic_hook::PanicBridge;
use crate::transport::{HttpTransport, HttpTransportConfig};

/// Minimal options for [`init`].
#[derive(Debug, Clone)]
pub struct InitOptions {
	/// Tenant identifier embedded in the collector URL.
	pub dsn: String,
	/// Host whose error channels are captured.
	pub host: Arc<Host>,
}

/// Initializes the SDK with default settings.
///
/// Must be called from within a Tokio runtime.
pub fn init(options: InitOptions) -> Result<MonitorClient> {
	MonitorClient::builder()
		.dsn(options.dsn)
		.host(options.host)
		.build()
}

/// Builder for [`MonitorClient`].
pub struct MonitorClientBuilder {
	dsn: Option<String>,
	host: Option<Arc<Host>>,
	transport_config: HttpTransportConfig,
	sdk_version: Option<String>,
	integration: ErrorsIntegrationOptions,
	transport: Option<Arc<dyn Transport>>,
	capture_panics: bool,
}

impl MonitorClientBuilder {
	pub fn new() -> Self {
		Self {
			dsn: None,
			host: None,
			transport_config: HttpTransportConfig::default(),
			sdk_version: Some(SDK_VERSION.to_string()),
			integration: ErrorsIntegrationOptions::default(),
			transport: None,
			capture_panics: false,
		}
	}

	/// Sets the tenant DSN (required).
	pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
		self.dsn = Some(dsn.into());
		self
	}

	/// Sets the host whose channels are captured (required).
	pub fn host(mut self, host: Arc<Host>) -> Self {
		self.host = Some(host);
		self
	}

	/// Sets the collector base URL.
	///
	/// Example: `https://collector.example.com/dsn-server`
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.transport_config.base_url = url.into();
		self
	}

	/// Sets the timeout for a single delivery request.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.transport_config.request_timeout = timeout;
		self
	}

	/// Sets the version stamped into envelope headers; `None` omits it.
	pub fn sdk_version(mut self, version: Option<String>) -> Self {
		self.sdk_version = version;
		self
	}

	/// Configures which host channels are captured and the `before_send` filter.
	pub fn errors(mut self, options: ErrorsIntegrationOptions) -> Self {
		self.integration = options;
		self
	}

	/// Uses `transport` instead of the HTTP transport.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Also forwards process panics into the host's synchronous channel.
	pub fn capture_panics(mut self, enabled: bool) -> Self {
		self.capture_panics = enabled;
		self
	}

	/// Builds the client and installs error capture on the host.
	///
	/// Must be called from within a Tokio runtime.
	pub fn build(self) -> Result<MonitorClient> {
		let dsn = self
			.dsn
			.filter(|dsn| !dsn.trim().is_empty())
			.ok_or(MonitorSdkError::MissingDsn)?;
		let host = self.host.ok_or(MonitorSdkError::MissingHost)?;

		let transport = match self.transport {
			Some(transport) => transport,
			None => {
				validate_base_url(&self.transport_config.base_url)?;
				let transport = HttpTransport::new(&dsn, self.transport_config)?.with_host(&host);
				Arc::new(transport) as Arc<dyn Transport>
			}
		};

		let monitoring = Monitoring::new(MonitoringOptions {
			sdk_version: self.sdk_version,
		});
		let dispatcher = monitoring.init(transport)?.clone();

		let mut integration = ErrorsIntegration::new(dispatcher, Arc::clone(&host), self.integration);
		integration.init()?;

		let panic_bridge = self.capture_panics.then(|| PanicBridge::install(&host));

		info!(dsn = %dsn, capture_panics = self.capture_panics, "Monitor client initialized");

		Ok(MonitorClient {
			monitoring,
			host,
			integration: Mutex::new(integration),
			panic_bridge: Mutex::new(panic_bridge),
			closed: AtomicBool::new(false),
		})
	}
}

impl Default for MonitorClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn validate_base_url(base_url: &str) -> Result<()> {
	let parsed = Url::parse(base_url).map_err(|e| MonitorSdkError::InvalidBaseUrl(e.to_string()))?;
	match parsed.scheme() {
		"http" | "https" => Ok(()),
		other => Err(MonitorSdkError::InvalidBaseUrl(format!(
			"unsupported scheme: {other}"
		))),
	}
}

/// The object a host application holds.
///
/// # Example
///
/// ```ignore
/// use loom_monitor::{Host, MonitorClient, MonitoringClient};
///
/// let host = Arc::new(Host::new("app://main"));
/// let client = MonitorClient::builder()
///     .dsn("app_123")
///     .host(Arc::clone(&host))
///     .base_url("https://collector.example.com/dsn-server")
///     .build()?;
///
/// client.report_message("checkout opened");
/// client.report_event(&serde_json::json!({"cart_items": 3}));
///
/// client.shutdown(Some(Duration::from_secs(2))).await;
/// ```
pub struct MonitorClient {
	monitoring: Monitoring,
	host: Arc<Host>,
	integration: Mutex<ErrorsIntegration>,
	panic_bridge: Mutex<Option<PanicBridge>>,
	closed: AtomicBool,
}

impl MonitorClient {
	pub fn builder() -> MonitorClientBuilder {
		MonitorClientBuilder::new()
	}

	pub fn host(&self) -> &Arc<Host> {
		&self.host
	}

	pub fn monitoring(&self) -> &Monitoring {
		&self.monitoring
	}

	/// Waits for in-flight reports; true if they drained before `timeout`.
	pub async fn flush(&self, timeout: Option<Duration>) -> bool {
		self.monitoring.flush(timeout).await
	}

	/// Removes every hook, restoring the host's previous handlers, then
	/// flushes. Later reports are dropped. Calling it again only flushes.
	pub async fn shutdown(&self, timeout: Option<Duration>) -> bool {
		if !self.closed.swap(true, Ordering::SeqCst) {
			self.integration
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.destroy();

			let bridge = self
				.panic_bridge
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.take();
			if let Some(bridge) = bridge {
				bridge.uninstall();
			}

			info!("Monitor client shutdown");
		}

		self.flush(timeout).await
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}
}

impl MonitoringClient for MonitorClient {
	fn report_message(&self, message: &str) {
		if !self.is_closed() {
			self.monitoring.report_message(message);
		}
	}

	fn report_event<T: Serialize + ?Sized>(&self, event: &T) {
		if !self.is_closed() {
			self.monitoring.report_event(event);
		}
	}
}
