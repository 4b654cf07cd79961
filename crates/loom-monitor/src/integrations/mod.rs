// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capture integrations that hook host error channels.

pub mod errors;

pub use errors::{BeforeSend, ErrorsIntegration, ErrorsIntegrationOptions};
