//! Session handshake messages.
//!
//! The client opens the session by sending a single frame containing
//! `<protocol-version>,<token>`. The helper answers with the same text once it
//! has matched the token against the one it was launched with. A helper that
//! does not recognise the token closes the connection instead.

use std::fmt;

/// Protocol version spoken by this client. The helper refuses other versions.
pub const PROTOCOL_VERSION: &str = "1.2.4";

const SEPARATOR: char = ',';

/// Authentication message exchanged in both directions during the handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Hello {
	pub version: String,
	pub token: String,
}

impl Hello {
	/// Builds the hello this client sends for `token`.
	pub fn new(token: impl Into<String>) -> Self {
		Self {
			version: PROTOCOL_VERSION.to_string(),
			token: token.into(),
		}
	}

	/// Serializes to the on-wire text form.
	pub fn to_bytes(&self) -> Vec<u8> {
		format!("{}{}{}", self.version, SEPARATOR, self.token).into_bytes()
	}

	/// Parses a received hello or acknowledgement frame.
	///
	/// Returns `None` when the frame is not UTF-8 or lacks the separator.
	pub fn parse(bytes: &[u8]) -> Option<Self> {
		let text = std::str::from_utf8(bytes).ok()?;
		let (version, token) = text.split_once(SEPARATOR)?;
		Some(Self {
			version: version.to_string(),
			token: token.to_string(),
		})
	}

	/// Returns `true` when the version matches [`PROTOCOL_VERSION`].
	pub fn is_compatible(&self) -> bool {
		self.version == PROTOCOL_VERSION
	}
}

impl fmt::Debug for Hello {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hello").field("version", &self.version).field("token", &"<redacted>").finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hello_uses_version_comma_token_layout() {
		let hello = Hello::new("apple-river-stone");
		assert_eq!(hello.to_bytes(), b"1.2.4,apple-river-stone".to_vec());
	}

	#[test]
	fn parse_splits_on_first_separator_only() {
		let hello = Hello::parse(b"1.2.4,a,b").unwrap();
		assert_eq!(hello.version, "1.2.4");
		assert_eq!(hello.token, "a,b");
		assert!(hello.is_compatible());
	}

	#[test]
	fn parse_rejects_frames_without_separator() {
		assert!(Hello::parse(b"1.2.4").is_none());
		assert!(Hello::parse(&[0xff, 0xfe, b',']).is_none());
	}

	#[test]
	fn older_versions_are_incompatible() {
		let hello = Hello::parse(b"1.2.3,token").unwrap();
		assert!(!hello.is_compatible());
	}

	#[test]
	fn debug_output_hides_token() {
		let rendered = format!("{:?}", Hello::new("secret-words-here"));
		assert!(!rendered.contains("secret"));
	}
}
