// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment descriptor sent alongside every envelope.
//!
//! Non-identifying only: no hostname, no username.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::http::{user_agent, SDK_NAME, SDK_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsContext {
	pub name: String,
	pub arch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeContext {
	pub name: String,
	pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
	pub url: String,
}

/// Where an envelope was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
	pub os: OsContext,
	pub runtime: RuntimeContext,
	pub page: PageContext,
	/// Wall-clock milliseconds when the descriptor was collected.
	pub timestamp: i64,
	pub user_agent: String,
}

impl HostInfo {
	/// Collects the descriptor for the current process.
	pub fn collect(page_url: impl Into<String>) -> Self {
		Self {
			os: OsContext {
				name: std::env::consts::OS.to_string(),
				arch: std::env::consts::ARCH.to_string(),
			},
			runtime: RuntimeContext {
				name: SDK_NAME.to_string(),
				version: SDK_VERSION.to_string(),
			},
			page: PageContext {
				url: page_url.into(),
			},
			timestamp: Utc::now().timestamp_millis(),
			user_agent: user_agent(),
		}
	}
}
