//! Error types for the bridge.
//!
//! Each layer has its own enum so callers can tell which phase failed:
//! bootstrapping the helper, authenticating to it, or moving bytes over an
//! established session. Failures of the privileged operation itself are not
//! errors here; they travel inside [`CallResult::error`](privbridge_protocol::CallResult).

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level bridge error.
#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid configuration: {0}")]
	Config(String),

	#[error(transparent)]
	Bootstrap(#[from] BootstrapError),

	#[error(transparent)]
	Handshake(#[from] HandshakeError),

	/// The helper was launched but the follow-up handshake still failed.
	#[error("failed to start helper: {0}")]
	HelperStart(#[source] HandshakeError),

	#[error(transparent)]
	Transport(#[from] TransportError),

	#[error("state store {}: {source}", .path.display())]
	Store {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("state store {} is corrupt: {source}", .path.display())]
	StoreCorrupt {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// Phase of the bridge lifecycle an [`Error`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	Config,
	Store,
	Bootstrap,
	Handshake,
	Transport,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Phase::Config => "config",
			Phase::Store => "store",
			Phase::Bootstrap => "bootstrap",
			Phase::Handshake => "handshake",
			Phase::Transport => "transport",
		})
	}
}

impl Error {
	pub fn phase(&self) -> Phase {
		match self {
			Error::Config(_) => Phase::Config,
			Error::Store { .. } | Error::StoreCorrupt { .. } => Phase::Store,
			Error::Bootstrap(_) => Phase::Bootstrap,
			Error::Handshake(_) | Error::HelperStart(_) => Phase::Handshake,
			Error::Transport(_) => Phase::Transport,
		}
	}

	/// Root denied, debug bridge unreachable, or the launch command failed.
	pub fn is_bootstrap_failure(&self) -> bool {
		matches!(self, Error::Bootstrap(_))
	}

	/// Rejected or empty token, timeout, or a helper that never came up.
	pub fn is_handshake_failure(&self) -> bool {
		matches!(self, Error::Handshake(_) | Error::HelperStart(_))
	}

	pub fn is_transport_failure(&self) -> bool {
		matches!(self, Error::Transport(_))
	}

	/// Transport failures that mean the session is dead and worth rebuilding.
	pub fn is_broken_pipe(&self) -> bool {
		matches!(self, Error::Transport(err) if err.is_broken_pipe())
	}
}

/// Failure to get the helper process running.
#[derive(Debug, Error)]
pub enum BootstrapError {
	#[error("root access denied")]
	RootDenied,

	#[error("helper launch command failed: {output}")]
	LaunchFailed { output: String },

	#[error("failed to connect to debug bridge at {host}:{port}: {source}")]
	DebugBridgeConnect {
		host: String,
		port: u16,
		#[source]
		source: io::Error,
	},

	#[error("failed to open debug bridge shell: {0}")]
	OpenShell(#[source] io::Error),

	#[error("failed to write to debug bridge shell: {0}")]
	ShellWrite(#[source] io::Error),

	#[error("failed to provision helper: {0}")]
	Provision(String),
}

/// Failure to authenticate a new session.
#[derive(Debug, Error)]
pub enum HandshakeError {
	#[error("no token supplied")]
	EmptyToken,

	#[error("failed to connect to helper at {addr}: {source}")]
	Connect {
		addr: SocketAddr,
		#[source]
		source: io::Error,
	},

	#[error("timed out connecting to helper at {addr}")]
	ConnectTimeout { addr: SocketAddr },

	#[error("helper rejected the token")]
	Rejected,

	#[error("helper speaks protocol {found}, expected {expected}")]
	ProtocolMismatch { expected: &'static str, found: String },

	#[error("handshake timed out after {0:?}")]
	Timeout(Duration),

	#[error("handshake failed: {0}")]
	Transport(#[source] TransportError),
}

impl HandshakeError {
	/// Nothing is listening on the helper port yet.
	pub fn is_unreachable(&self) -> bool {
		matches!(self, HandshakeError::Connect { .. } | HandshakeError::ConnectTimeout { .. })
	}
}

/// Failure while exchanging frames over an established channel.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("transport is closed")]
	Closed,

	#[error("i/o error: {0}")]
	Io(#[from] io::Error),

	#[error("no reply within {0:?}")]
	Timeout(Duration),

	#[error("frame of {0} bytes exceeds the frame limit")]
	FrameTooLarge(u64),

	#[error("malformed message: {0}")]
	Codec(#[from] serde_json::Error),
}

impl TransportError {
	/// Errors after which the peer is gone: the session must be rebuilt.
	pub fn is_broken_pipe(&self) -> bool {
		match self {
			TransportError::Closed => true,
			TransportError::Io(err) => {
				matches!(
					err.kind(),
					io::ErrorKind::BrokenPipe
						| io::ErrorKind::ConnectionReset
						| io::ErrorKind::ConnectionAborted
						| io::ErrorKind::NotConnected
						| io::ErrorKind::UnexpectedEof
				) || err.to_string().contains("pipe")
			}
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn broken_pipe_class_covers_dead_peers() {
		for kind in [io::ErrorKind::BrokenPipe, io::ErrorKind::ConnectionReset, io::ErrorKind::UnexpectedEof] {
			assert!(TransportError::Io(io::Error::from(kind)).is_broken_pipe(), "{kind:?}");
		}
		assert!(TransportError::Io(io::Error::other("write: pipe is being closed")).is_broken_pipe());
		assert!(TransportError::Closed.is_broken_pipe());
	}

	#[test]
	fn other_transport_errors_are_not_broken_pipe() {
		assert!(!TransportError::Timeout(Duration::from_secs(30)).is_broken_pipe());
		assert!(!TransportError::Io(io::Error::from(io::ErrorKind::PermissionDenied)).is_broken_pipe());
		assert!(!TransportError::FrameTooLarge(u64::MAX).is_broken_pipe());
	}

	#[test]
	fn phase_reflects_failing_layer() {
		let err = Error::HelperStart(HandshakeError::Rejected);
		assert_eq!(err.phase(), Phase::Handshake);
		assert!(err.is_handshake_failure());
		assert!(!err.is_bootstrap_failure());
		assert_eq!(err.to_string(), "failed to start helper: helper rejected the token");

		let err = Error::from(BootstrapError::RootDenied);
		assert_eq!(err.phase(), Phase::Bootstrap);
		assert!(err.is_bootstrap_failure());

		let err = Error::from(TransportError::Closed);
		assert!(err.is_transport_failure());
		assert!(err.is_broken_pipe());
	}

	#[test]
	fn only_connect_failures_are_unreachable() {
		let addr: SocketAddr = "127.0.0.1:60001".parse().unwrap();
		assert!(HandshakeError::ConnectTimeout { addr }.is_unreachable());
		assert!(!HandshakeError::Rejected.is_unreachable());
		assert!(!HandshakeError::EmptyToken.is_unreachable());
	}
}
