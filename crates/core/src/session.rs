//! Authenticated session with a running helper.

use std::time::Duration;

use privbridge_protocol::{Call, CallResult, Hello, PROTOCOL_VERSION};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::HelperEndpoint;
use crate::error::{HandshakeError, TransportError};
use crate::token::Token;
use crate::transport::{ChannelTransport, TransportResult};

/// One logical connection to the helper.
///
/// Exists only after a successful handshake. Once closed, or once its
/// transport fails, it stays dead and must be replaced.
#[derive(Debug)]
pub struct Session<S = TcpStream> {
	transport: ChannelTransport<S>,
	running: bool,
}

impl Session<TcpStream> {
	/// Connects to the helper on `endpoint` and authenticates with `token`.
	///
	/// An empty token fails before any connection is attempted.
	pub async fn connect(endpoint: &HelperEndpoint, token: &Token, connect_timeout: Duration, read_timeout: Duration) -> Result<Self, HandshakeError> {
		if token.is_empty() {
			return Err(HandshakeError::EmptyToken);
		}

		let addr = endpoint.socket_addr();
		let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
			Ok(Ok(stream)) => stream,
			Ok(Err(source)) => return Err(HandshakeError::Connect { addr, source }),
			Err(_) => return Err(HandshakeError::ConnectTimeout { addr }),
		};
		let _ = stream.set_nodelay(true);

		debug!(target = "privbridge.session", %addr, "connected; shaking hands");
		Self::handshake(stream, token, read_timeout).await
	}
}

impl<S> Session<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send,
{
	/// Runs the handshake over an already-open stream.
	///
	/// The helper must echo the hello back. A helper that hangs up instead has
	/// rejected the token.
	pub async fn handshake(stream: S, token: &Token, read_timeout: Duration) -> Result<Self, HandshakeError> {
		if token.is_empty() {
			return Err(HandshakeError::EmptyToken);
		}

		let mut transport = ChannelTransport::new(stream, read_timeout);
		let hello = Hello::new(token.expose());

		transport.send_frame(&hello.to_bytes()).await.map_err(rejection)?;
		let reply = transport.recv_frame().await.map_err(rejection)?;

		let Some(ack) = Hello::parse(&reply) else {
			transport.shutdown().await;
			return Err(HandshakeError::Rejected);
		};
		if !ack.is_compatible() {
			transport.shutdown().await;
			return Err(HandshakeError::ProtocolMismatch {
				expected: PROTOCOL_VERSION,
				found: ack.version,
			});
		}
		if ack.token != token.expose() {
			transport.shutdown().await;
			return Err(HandshakeError::Rejected);
		}

		debug!(target = "privbridge.session", "handshake complete");
		Ok(Self { transport, running: true })
	}

	pub fn is_running(&self) -> bool {
		self.running && !self.transport.is_closed()
	}

	/// Sends `call` and waits for its result.
	pub async fn call(&mut self, call: &Call) -> TransportResult<CallResult> {
		if !self.running {
			return Err(TransportError::Closed);
		}
		self.transport.call(call).await
	}

	/// Best-effort request for the helper to exit.
	pub async fn send_close(&mut self) -> TransportResult<()> {
		if !self.running {
			return Err(TransportError::Closed);
		}
		self.transport.send_close().await
	}

	/// Closes the session. Idempotent.
	pub async fn close(&mut self) {
		self.running = false;
		self.transport.shutdown().await;
	}
}

fn rejection(err: TransportError) -> HandshakeError {
	match err {
		TransportError::Timeout(after) => HandshakeError::Timeout(after),
		err if err.is_broken_pipe() => HandshakeError::Rejected,
		err => HandshakeError::Transport(err),
	}
}
