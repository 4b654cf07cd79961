// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the monitoring core.

use thiserror::Error;

/// Errors raised by the monitoring core.
///
/// None of these are produced on the reporting path; they only surface from
/// construction and initialization, where failing loudly is safe.
#[derive(Debug, Error)]
pub enum MonitorError {
	/// An envelope must carry at least one item.
	#[error("envelope must contain at least one item")]
	EmptyEnvelope,

	/// The facade already owns a transport.
	#[error("transport has already been set")]
	TransportAlreadySet,

	/// No Tokio runtime was available to run deliveries on.
	#[error("no Tokio runtime available: {0}")]
	NoRuntime(#[from] tokio::runtime::TryCurrentError),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type alias for monitoring core operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
