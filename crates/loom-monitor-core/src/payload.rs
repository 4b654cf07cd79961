// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Normalized error payload shared by every capture channel.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Source channel of a captured error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
	/// Uncaught synchronous error.
	JsError,
	/// Async failure nobody handled.
	UnhandledRejection,
	/// Embeddable resource that failed to load.
	ResourceError,
}

impl fmt::Display for ErrorType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ErrorType::JsError => write!(f, "js_error"),
			ErrorType::UnhandledRejection => write!(f, "unhandled_rejection"),
			ErrorType::ResourceError => write!(f, "resource_error"),
		}
	}
}

/// A captured error, ready to be filtered and wrapped in an envelope.
///
/// `filename`, `lineno` and `colno` stay `None` when the channel did not
/// supply them; a reported `0` is kept as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
	error_type: ErrorType,
	pub name: String,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lineno: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub colno: Option<u32>,
	pub page_url: String,
	/// Wall-clock milliseconds since the Unix epoch.
	pub timestamp: i64,
}

impl ErrorPayload {
	/// Creates a payload stamped with the current time.
	pub fn new(
		error_type: ErrorType,
		name: impl Into<String>,
		message: impl Into<String>,
		page_url: impl Into<String>,
	) -> Self {
		Self {
			error_type,
			name: name.into(),
			message: message.into(),
			stack: None,
			filename: None,
			lineno: None,
			colno: None,
			page_url: page_url.into(),
			timestamp: Utc::now().timestamp_millis(),
		}
	}

	/// The channel this payload came from; fixed at construction.
	pub fn error_type(&self) -> ErrorType {
		self.error_type
	}

	pub fn with_stack(mut self, stack: Option<String>) -> Self {
		self.stack = stack;
		self
	}

	pub fn with_location(
		mut self,
		filename: Option<String>,
		lineno: Option<u32>,
		colno: Option<u32>,
	) -> Self {
		self.filename = filename;
		self.lineno = lineno;
		self.colno = colno;
		self
	}
}
