// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Envelope: the wire structure handed to a transport.
//!
//! An envelope is a header plus an ordered, non-empty list of items. Current
//! producers emit exactly one item per envelope, but consumers must accept
//! any number of items under one header.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{MonitorError, Result};

/// Kind of data carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeType {
	/// Plain message, e.g. a tracking point or log line.
	Message,
	/// Structured event: captured errors, business events, measurements.
	Event,
}

impl fmt::Display for EnvelopeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EnvelopeType::Message => write!(f, "message"),
			EnvelopeType::Event => write!(f, "event"),
		}
	}
}

/// Envelope metadata used by the collector for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
	#[serde(rename = "type")]
	pub envelope_type: EnvelopeType,
	/// Wall-clock milliseconds since the Unix epoch.
	pub timestamp: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sdk_version: Option<String>,
}

impl EnvelopeHeader {
	/// Creates a header stamped with the current wall-clock time.
	pub fn new(envelope_type: EnvelopeType) -> Self {
		Self {
			envelope_type,
			timestamp: Utc::now().timestamp_millis(),
			sdk_version: None,
		}
	}

	pub fn with_sdk_version(mut self, version: impl Into<String>) -> Self {
		self.sdk_version = Some(version.into());
		self
	}
}

/// A single payload inside an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeItem<T> {
	#[serde(rename = "type")]
	pub item_type: EnvelopeType,
	pub payload: T,
}

/// Header plus one or more items.
///
/// Fields are private so the non-empty invariant holds for every value,
/// including deserialized ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T = serde_json::Value> {
	header: EnvelopeHeader,
	items: Vec<EnvelopeItem<T>>,
}

impl<T> Envelope<T> {
	/// Wraps a single payload under the header's type.
	pub fn single(header: EnvelopeHeader, payload: T) -> Self {
		let item_type = header.envelope_type;
		Self {
			header,
			items: vec![EnvelopeItem { item_type, payload }],
		}
	}

	/// Wraps several payloads under one header.
	pub fn batch(header: EnvelopeHeader, payloads: impl IntoIterator<Item = T>) -> Result<Self> {
		let item_type = header.envelope_type;
		let items: Vec<_> = payloads
			.into_iter()
			.map(|payload| EnvelopeItem { item_type, payload })
			.collect();

		if items.is_empty() {
			return Err(MonitorError::EmptyEnvelope);
		}

		Ok(Self { header, items })
	}

	pub fn header(&self) -> &EnvelopeHeader {
		&self.header
	}

	pub fn items(&self) -> &[EnvelopeItem<T>] {
		&self.items
	}

	pub fn envelope_type(&self) -> EnvelopeType {
		self.header.envelope_type
	}

	/// Number of items; always at least one.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}

impl<T: Serialize> Envelope<T> {
	/// Erases the payload type so the envelope can cross a `dyn Transport`.
	pub fn into_value(self) -> Result<Envelope<serde_json::Value>> {
		let items = self
			.items
			.into_iter()
			.map(|item| {
				Ok(EnvelopeItem {
					item_type: item.item_type,
					payload: serde_json::to_value(item.payload)?,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		Ok(Envelope {
			header: self.header,
			items,
		})
	}
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		#[derive(Deserialize)]
		struct Raw<T> {
			header: EnvelopeHeader,
			items: Vec<EnvelopeItem<T>>,
		}

		let raw = Raw::<T>::deserialize(deserializer)?;
		if raw.items.is_empty() {
			return Err(serde::de::Error::custom(MonitorError::EmptyEnvelope));
		}

		Ok(Self {
			header: raw.header,
			items: raw.items,
		})
	}
}

/// Builds a single-item envelope stamped with the current time.
///
/// Any payload is accepted and preserved verbatim, including `()` and
/// `serde_json::Value::Null`.
pub fn create_envelope<T>(envelope_type: EnvelopeType, payload: T) -> Envelope<T> {
	Envelope::single(EnvelopeHeader::new(envelope_type), payload)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	#[test]
	fn test_create_envelope_single_item_matches_header_type() {
		let envelope = create_envelope(EnvelopeType::Event, json!({"event": 1}));

		assert_eq!(envelope.envelope_type(), EnvelopeType::Event);
		assert_eq!(envelope.len(), 1);
		assert_eq!(envelope.items()[0].item_type, EnvelopeType::Event);
		assert_eq!(envelope.items()[0].payload, json!({"event": 1}));
		assert!(envelope.header().sdk_version.is_none());
	}

	#[test]
	fn test_create_envelope_stamps_current_time() {
		let before = Utc::now().timestamp_millis();
		let envelope = create_envelope(EnvelopeType::Message, ());
		let after = Utc::now().timestamp_millis();

		assert!(envelope.header().timestamp >= before);
		assert!(envelope.header().timestamp <= after);
	}

	#[test]
	fn test_null_payload_is_preserved() {
		let envelope = create_envelope(EnvelopeType::Message, serde_json::Value::Null);
		let value = serde_json::to_value(&envelope).unwrap();

		assert_eq!(value["items"][0]["payload"], serde_json::Value::Null);
		assert_eq!(value["items"][0]["type"], "message");
	}

	#[test]
	fn test_wire_format() {
		let header = EnvelopeHeader::new(EnvelopeType::Event).with_sdk_version("1.2.3");
		let envelope = Envelope::single(header, json!({"a": "b"}));
		let value = serde_json::to_value(&envelope).unwrap();

		assert_eq!(value["header"]["type"], "event");
		assert_eq!(value["header"]["sdk_version"], "1.2.3");
		assert!(value["header"]["timestamp"].is_i64());
		assert_eq!(value["items"], json!([{"type": "event", "payload": {"a": "b"}}]));
	}

	#[test]
	fn test_sdk_version_omitted_when_unset() {
		let value = serde_json::to_value(create_envelope(EnvelopeType::Event, 1)).unwrap();
		assert!(value["header"].get("sdk_version").is_none());
	}

	#[test]
	fn test_batch_rejects_empty() {
		let result = Envelope::<i32>::batch(EnvelopeHeader::new(EnvelopeType::Event), Vec::new());
		assert!(matches!(result, Err(MonitorError::EmptyEnvelope)));
	}

	#[test]
	fn test_batch_keeps_order() {
		let envelope =
			Envelope::batch(EnvelopeHeader::new(EnvelopeType::Message), vec!["a", "b", "c"]).unwrap();

		assert_eq!(envelope.len(), 3);
		let payloads: Vec<_> = envelope.items().iter().map(|i| i.payload).collect();
		assert_eq!(payloads, vec!["a", "b", "c"]);
		assert!(envelope
			.items()
			.iter()
			.all(|i| i.item_type == EnvelopeType::Message));
	}

	#[test]
	fn test_deserialize_rejects_empty_items() {
		let raw = json!({
			"header": {"type": "event", "timestamp": 1},
			"items": []
		});
		let result: std::result::Result<Envelope, _> = serde_json::from_value(raw);
		assert!(result.is_err());
	}

	#[test]
	fn test_deserialize_multi_item() {
		let raw = json!({
			"header": {"type": "event", "timestamp": 1700000000000_i64},
			"items": [
				{"type": "event", "payload": {"n": 1}},
				{"type": "event", "payload": {"n": 2}}
			]
		});
		let envelope: Envelope = serde_json::from_value(raw).unwrap();
		assert_eq!(envelope.len(), 2);
		assert_eq!(envelope.header().timestamp, 1700000000000);
	}

	#[test]
	fn test_into_value_erases_payload_type() {
		#[derive(Serialize)]
		struct Payload {
			name: &'static str,
		}

		let envelope = create_envelope(EnvelopeType::Event, Payload { name: "x" })
			.into_value()
			.unwrap();
		assert_eq!(envelope.items()[0].payload, json!({"name": "x"}));
	}

	proptest! {
		#[test]
		fn create_envelope_preserves_payload(s in ".*", n in any::<i64>()) {
			let payload = json!({"text": s, "n": n});
			let envelope = create_envelope(EnvelopeType::Event, payload.clone());
			prop_assert_eq!(envelope.len(), 1);
			prop_assert_eq!(&envelope.items()[0].payload, &payload);
		}
	}
}
