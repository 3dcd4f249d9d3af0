//! Call envelope carried across the bridge.
//!
//! The bridge never looks inside a call payload. Higher-level command builders
//! produce the bytes, the helper consumes them, and the bridge only moves them.
//!
//! Request format:
//! ```json
//! { "type": "call", "kind": "shell", "payload": "ZWNobyBvaw==" }
//! ```
//!
//! Close request (no reply is sent):
//! ```json
//! { "type": "close" }
//! ```
//!
//! Reply format, with either field set:
//! ```json
//! { "reply": "b2sK", "error": null }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the helper should do with a call payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
	/// Raw shell execution; the payload is the command text.
	Shell,
	/// Structured invocation of a helper-side class processor.
	Class,
	/// Any other structured call, e.g. a system-service method invocation.
	Other,
}

/// A single request for the helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
	pub kind: CallKind,
	#[serde(with = "base64_bytes")]
	pub payload: Vec<u8>,
}

impl Call {
	pub fn new(kind: CallKind, payload: impl Into<Vec<u8>>) -> Self {
		Self {
			kind,
			payload: payload.into(),
		}
	}

	/// Builds a shell call whose payload is `command` as UTF-8.
	pub fn shell(command: impl AsRef<str>) -> Self {
		Self::new(CallKind::Shell, command.as_ref().as_bytes())
	}
}

/// Frame sent from client to helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
	Call(Call),
	/// Asks the helper to exit. Send-only.
	Close,
}

impl Envelope {
	pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
		serde_json::to_vec(self)
	}

	pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
		serde_json::from_slice(bytes)
	}
}

/// Exception captured on the helper side while running a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
	/// Exception type name as reported by the helper.
	pub class_name: String,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

impl fmt::Display for RemoteError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.class_name, self.message)
	}
}

impl std::error::Error for RemoteError {}

/// Reply to a [`Call`].
///
/// A populated `error` means the bridge worked but the privileged operation
/// failed on the helper side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
	#[serde(default, with = "base64_opt_bytes")]
	pub reply: Option<Vec<u8>>,
	#[serde(default)]
	pub error: Option<RemoteError>,
}

impl CallResult {
	pub fn reply(bytes: impl Into<Vec<u8>>) -> Self {
		Self {
			reply: Some(bytes.into()),
			error: None,
		}
	}

	pub fn failed(error: RemoteError) -> Self {
		Self { reply: None, error: Some(error) }
	}

	pub fn is_error(&self) -> bool {
		self.error.is_some()
	}

	/// Reply decoded as UTF-8, lossily.
	pub fn reply_text(&self) -> Option<String> {
		self.reply.as_deref().map(|bytes| String::from_utf8_lossy(bytes).into_owned())
	}

	/// Splits into the reply or the captured remote error. The error wins when both are set.
	pub fn into_result(self) -> Result<Option<Vec<u8>>, RemoteError> {
		match self.error {
			Some(error) => Err(error),
			None => Ok(self.reply),
		}
	}

	pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
		serde_json::to_vec(self)
	}

	pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
		serde_json::from_slice(bytes)
	}
}

mod base64_bytes {
	use base64::Engine as _;
	use base64::engine::general_purpose::STANDARD;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let encoded = String::deserialize(deserializer)?;
		STANDARD.decode(encoded).map_err(serde::de::Error::custom)
	}
}

mod base64_opt_bytes {
	use base64::Engine as _;
	use base64::engine::general_purpose::STANDARD;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
		match bytes {
			Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
		Option::<String>::deserialize(deserializer)?
			.map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
			.transpose()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn call_envelope_wire_shape() {
		let bytes = Envelope::Call(Call::shell("echo ok")).to_bytes().unwrap();
		let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(value, json!({ "type": "call", "kind": "shell", "payload": "ZWNobyBvaw==" }));
	}

	#[test]
	fn close_envelope_carries_no_payload() {
		let value: serde_json::Value = serde_json::from_slice(&Envelope::Close.to_bytes().unwrap()).unwrap();
		assert_eq!(value, json!({ "type": "close" }));
	}

	#[test]
	fn reply_with_error_decodes() {
		let raw = br#"{"reply":null,"error":{"className":"java.lang.SecurityException","message":"denied"}}"#;
		let result = CallResult::from_bytes(raw).unwrap();
		assert!(result.is_error());
		let err = result.into_result().unwrap_err();
		assert_eq!(err.to_string(), "java.lang.SecurityException: denied");
		assert!(err.stack.is_none());
	}

	#[test]
	fn reply_fields_default_when_absent() {
		let result = CallResult::from_bytes(b"{}").unwrap();
		assert_eq!(result, CallResult::default());
		assert_eq!(result.into_result().unwrap(), None);
	}

	#[test]
	fn reply_text_is_lossy_utf8() {
		let result = CallResult::reply(b"ok\n".to_vec());
		assert_eq!(result.reply_text().as_deref(), Some("ok\n"));
	}

	#[test]
	fn invalid_base64_payload_is_a_decode_error() {
		assert!(Envelope::from_bytes(br#"{"type":"call","kind":"class","payload":"***"}"#).is_err());
	}
}
