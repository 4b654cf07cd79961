// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport that POSTs each envelope to the collector.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use loom_monitor_core::{Envelope, Transport, TransportResponse};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{MonitorSdkError, Result};
use crate::host::Host;
use crate::host_info::HostInfo;

/// Collector used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3004/dsn-server";

/// Response headers surfaced in [`TransportResponse::headers`].
const SURFACED_HEADERS: &[&str] = &["x-rate-limit", "retry-after"];

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
	/// Collector base URL, without trailing slash.
	pub base_url: String,
	/// Timeout for a single POST.
	pub request_timeout: Duration,
}

impl Default for HttpTransportConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.to_string(),
			request_timeout: Duration::from_secs(30),
		}
	}
}

/// Body of a tracking request: the envelope plus the environment descriptor.
#[derive(Serialize)]
struct TrackingRequest<'a> {
	#[serde(flatten)]
	envelope: &'a Envelope,
	#[serde(rename = "browserInfo")]
	host_info: HostInfo,
}

/// Sends one POST per envelope to `{base_url}/span/tracking/{dsn}`.
///
/// No retry and no backoff. Every failure is folded into the returned
/// [`TransportResponse`]; `send` never fails.
pub struct HttpTransport {
	client: Client,
	endpoint: Url,
	host: Option<Weak<Host>>,
}

impl HttpTransport {
	/// The DSN is percent-encoded as a single path segment.
	pub fn new(dsn: &str, config: HttpTransportConfig) -> Result<Self> {
		let client = crate::http::builder()
			.timeout(config.request_timeout)
			.build()
			.map_err(MonitorSdkError::HttpClient)?;

		let endpoint = tracking_endpoint(&config.base_url, dsn)?;

		Ok(Self {
			client,
			endpoint,
			host: None,
		})
	}

	/// Reads the page URL for the environment descriptor from `host`.
	pub fn with_host(mut self, host: &Arc<Host>) -> Self {
		self.host = Some(Arc::downgrade(host));
		self
	}

	pub fn endpoint(&self) -> &str {
		self.endpoint.as_str()
	}

	fn host_info(&self) -> HostInfo {
		let page_url = self
			.host
			.as_ref()
			.and_then(Weak::upgrade)
			.map(|host| host.location())
			.unwrap_or_default();
		HostInfo::collect(page_url)
	}
}

fn tracking_endpoint(base_url: &str, dsn: &str) -> Result<Url> {
	let mut endpoint =
		Url::parse(base_url).map_err(|e| MonitorSdkError::InvalidBaseUrl(e.to_string()))?;
	endpoint
		.path_segments_mut()
		.map_err(|_| MonitorSdkError::InvalidBaseUrl(format!("not a base URL: {base_url}")))?
		.pop_if_empty()
		.extend(["span", "tracking", dsn]);
	Ok(endpoint)
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
	async fn send(&self, envelope: Envelope) -> TransportResponse {
		let body = TrackingRequest {
			envelope: &envelope,
			host_info: self.host_info(),
		};

		let response = match self.client.post(self.endpoint.clone()).json(&body).send().await {
			Ok(response) => response,
			Err(e) => {
				warn!(endpoint = %self.endpoint, error = %e, "Failed to send envelope");
				return TransportResponse::failed();
			}
		};

		let status = response.status().as_u16();
		let headers: HashMap<String, Option<String>> = SURFACED_HEADERS
			.iter()
			.map(|name| {
				let value = response
					.headers()
					.get(*name)
					.and_then(|v| v.to_str().ok())
					.map(str::to_string);
				(name.to_string(), value)
			})
			.collect();

		if response.status().is_success() {
			debug!(status, "Envelope accepted by collector");
		} else {
			debug!(status, "Collector returned non-success status");
		}

		TransportResponse::new(status).with_headers(headers)
	}
}
