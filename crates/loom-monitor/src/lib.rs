// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client monitoring SDK for Loom.
//!
//! Captures errors raised on a host's error channels, wraps them in envelopes
//! and delivers them fire-and-forget to the Loom collector. Hosts can also
//! report tracking messages and custom events by hand.
//!
//! # Features
//!
//! - **Error capture**: synchronous errors, unhandled rejections and resource
//!   load failures, chained in front of any handler the host already had
//! - **Reversible install**: shutdown puts back the host's exact handlers
//! - **Failure boundary**: a failing filter, serializer or transport never
//!   produces a new report
//! - **Panic capture**: optional bridge from the process panic hook
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use loom_monitor::{Host, MonitorClient, MonitoringClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Arc::new(Host::new("app://main"));
//!
//!     let client = MonitorClient::builder()
//!         .dsn("app_123")
//!         .host(Arc::clone(&host))
//!         .base_url("https://collector.example.com/dsn-server")
//!         .capture_panics(true)
//!         .build()?;
//!
//!     client.report_message("app started");
//!
//!     // Errors raised on the host are now reported automatically.
//!     host.dispatch_rejection("connection reset");
//!
//!     client.shutdown(None).await;
//!     Ok(())
//! }
//! ```

mod client;
mod error;
pub mod host;
mod host_info;
mod http;
pub mod integrations;
mod panic_hook;
mod stack;
pub mod transport;

pub use client::{init, InitOptions, MonitorClient, MonitorClientBuilder};
pub use error::{MonitorSdkError, Result};
pub use host::{
	Element, ErrorEvent, EventTarget, Host, HostError, ListenerId, Reason, RejectionEvent,
	ScriptError,
};
pub use host_info::{HostInfo, OsContext, PageContext, RuntimeContext};
pub use http::{SDK_NAME, SDK_VERSION};
pub use integrations::{BeforeSend, ErrorsIntegration, ErrorsIntegrationOptions};
pub use panic_hook::{PanicBridge, PANIC_ERROR_NAME};
pub use transport::{HttpTransport, HttpTransportConfig, DEFAULT_BASE_URL};

// Re-export core types for convenience
pub use loom_monitor_core::{
	create_envelope, Dispatcher, Envelope, EnvelopeHeader, EnvelopeItem, EnvelopeType,
	ErrorPayload, ErrorType, MonitorError, Monitoring, MonitoringClient, MonitoringOptions,
	NoopTransport, Transport, TransportResponse,
};
