// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport contract: how envelopes leave the process.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// Outcome of a single send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportResponse {
	/// HTTP status, or [`TransportResponse::NO_RESPONSE`] when none was obtained.
	pub status_code: u16,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub headers: Option<HashMap<String, Option<String>>>,
}

impl TransportResponse {
	/// Sentinel status for network or transport-level failure.
	pub const NO_RESPONSE: u16 = 0;

	pub fn new(status_code: u16) -> Self {
		Self {
			status_code,
			headers: None,
		}
	}

	/// Response for an attempt that never produced an HTTP response.
	pub fn failed() -> Self {
		Self::new(Self::NO_RESPONSE)
	}

	pub fn with_headers(mut self, headers: HashMap<String, Option<String>>) -> Self {
		self.headers = Some(headers);
		self
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status_code)
	}

	/// True when no HTTP response was obtained at all.
	pub fn is_transport_failure(&self) -> bool {
		self.status_code == Self::NO_RESPONSE
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.as_ref()?.get(name)?.as_deref()
	}
}

/// Delivery medium for envelopes.
///
/// `send` is infallible by signature: implementations fold network,
/// serialization and status failures into the returned response. Callers on
/// the capture path rely on this to never fail inside an error handler.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
	/// Sends one envelope. Exactly one delivery attempt, no retry.
	async fn send(&self, envelope: Envelope) -> TransportResponse;

	/// Drains any buffered envelopes, returning whether that finished in time.
	///
	/// Non-buffering transports return `true` immediately.
	async fn flush(&self, _timeout: Option<Duration>) -> bool {
		true
	}
}

/// Transport that drops every envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

#[async_trait::async_trait]
impl Transport for NoopTransport {
	async fn send(&self, _envelope: Envelope) -> TransportResponse {
		TransportResponse::new(200)
	}
}
