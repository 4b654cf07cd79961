// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport implementations.

pub mod http;

pub use http::{HttpTransport, HttpTransportConfig, DEFAULT_BASE_URL};
pub use loom_monitor_core::{NoopTransport, Transport, TransportResponse};
