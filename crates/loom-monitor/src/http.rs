// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client with the SDK's User-Agent header.

use reqwest::{Client, ClientBuilder};

/// SDK version for identification.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// SDK name for identification.
pub const SDK_NAME: &str = "loom-monitor-rust";

/// `{os}-{arch}`, e.g. `linux-x86_64`.
pub fn platform() -> String {
	format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Returns the SDK User-Agent string.
///
/// Format: `loom-monitor/{platform}/{version}`
pub fn user_agent() -> String {
	format!("loom-monitor/{}/{}", platform(), SDK_VERSION)
}

/// Creates an HTTP client builder carrying the SDK User-Agent.
///
/// # Example
/// ```ignore
/// let client = crate::http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "loom-monitor");
		assert_eq!(parts[1], platform());
		assert_eq!(parts[2], SDK_VERSION);
	}
}
