use privbridge::{Phase, RemoteError};
use serde::{Deserialize, Serialize};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// The result envelope returned by all commands.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T> {
	pub schema_version: u32,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
}

/// Error information for failed commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	ConfigError,
	StoreError,
	BootstrapFailed,
	HandshakeFailed,
	TransportFailed,
	/// The helper ran the call but the privileged operation failed.
	RemoteCallFailed,
	InvalidInput,
}

impl ErrorCode {
	pub fn for_phase(phase: Phase) -> Self {
		match phase {
			Phase::Config => ErrorCode::ConfigError,
			Phase::Store => ErrorCode::StoreError,
			Phase::Bootstrap => ErrorCode::BootstrapFailed,
			Phase::Handshake => ErrorCode::HandshakeFailed,
			Phase::Transport => ErrorCode::TransportFailed,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
			ErrorCode::StoreError => write!(f, "STORE_ERROR"),
			ErrorCode::BootstrapFailed => write!(f, "BOOTSTRAP_FAILED"),
			ErrorCode::HandshakeFailed => write!(f, "HANDSHAKE_FAILED"),
			ErrorCode::TransportFailed => write!(f, "TRANSPORT_FAILED"),
			ErrorCode::RemoteCallFailed => write!(f, "REMOTE_CALL_FAILED"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
		}
	}
}

impl From<&RemoteError> for CommandError {
	fn from(error: &RemoteError) -> Self {
		CommandError {
			code: ErrorCode::RemoteCallFailed,
			message: error.to_string(),
			details: serde_json::to_value(error).ok(),
		}
	}
}
