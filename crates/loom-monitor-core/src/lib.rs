// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom client monitoring SDK.
//!
//! This crate holds the platform-independent half of the capture-and-deliver
//! pipeline:
//! - the [`Envelope`] wire model and [`create_envelope`]
//! - the normalized [`ErrorPayload`] produced by capture integrations
//! - the [`Transport`] contract, whose `send` never fails
//! - the [`Dispatcher`], which delivers envelopes fire-and-forget
//! - the [`Monitoring`] facade with `report_message` / `report_event`
//! - the reporting failure [`boundary`], which keeps reporter failures from
//!   turning into new reportable errors
//!
//! Platform integrations (host error channels, HTTP delivery) live in
//! `loom-monitor`.

pub mod boundary;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod monitoring;
pub mod payload;
pub mod transport;

pub use dispatch::Dispatcher;
pub use envelope::{create_envelope, Envelope, EnvelopeHeader, EnvelopeItem, EnvelopeType};
pub use error::{MonitorError, Result};
pub use monitoring::{Monitoring, MonitoringClient, MonitoringOptions};
pub use payload::{ErrorPayload, ErrorType};
pub use transport::{NoopTransport, Transport, TransportResponse};
