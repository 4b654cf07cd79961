// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the monitoring SDK.

use loom_monitor_core::MonitorError;
use thiserror::Error;

/// Result type alias for SDK setup operations.
pub type Result<T> = std::result::Result<T, MonitorSdkError>;

/// Configuration errors surfaced while setting the SDK up.
///
/// Capture and delivery never produce these; they fail only before any hook
/// is installed.
#[derive(Debug, Error)]
pub enum MonitorSdkError {
	/// Missing or empty tenant DSN.
	#[error("DSN is required")]
	MissingDsn,

	/// No host to install capture hooks on.
	#[error("host is required")]
	MissingHost,

	/// Collector base URL is not an absolute http(s) URL.
	#[error("invalid base URL: {0}")]
	InvalidBaseUrl(String),

	/// The error integration is already installed on its host.
	#[error("error integration is already installed")]
	AlreadyInstalled,

	/// The HTTP client could not be built.
	#[error("HTTP client error: {0}")]
	HttpClient(#[from] reqwest::Error),

	#[error(transparent)]
	Core(#[from] MonitorError),
}
