//! Framed request/response exchange over an authenticated byte channel.
//!
//! Strictly one outstanding request at a time: a [`Call`] frame goes out, the
//! matching [`CallResult`] frame comes back. Serialising callers is the
//! manager's job. Once any read or write fails the framing position is
//! unknown, so the transport latches closed and every later use fails with
//! [`TransportError::Closed`].

use std::time::Duration;

use privbridge_protocol::{Call, CallResult, Envelope, FRAME_HEADER_LEN, decode_header, encode_header};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::TransportError;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Length-prefixed channel to the helper.
#[derive(Debug)]
pub struct ChannelTransport<S> {
	stream: Option<S>,
	read_timeout: Duration,
}

impl<S> ChannelTransport<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send,
{
	pub fn new(stream: S, read_timeout: Duration) -> Self {
		Self {
			stream: Some(stream),
			read_timeout,
		}
	}

	pub fn is_closed(&self) -> bool {
		self.stream.is_none()
	}

	pub fn read_timeout(&self) -> Duration {
		self.read_timeout
	}

	/// Sends `call` and waits up to the read timeout for its result.
	pub async fn call(&mut self, call: &Call) -> TransportResult<CallResult> {
		let request = Envelope::Call(call.clone()).to_bytes()?;
		self.send_frame(&request).await?;
		let reply = self.recv_frame().await?;
		let result = CallResult::from_bytes(&reply);
		self.latch(result.map_err(TransportError::from))
	}

	/// Asks the helper to exit. No reply is expected.
	pub async fn send_close(&mut self) -> TransportResult<()> {
		let request = Envelope::Close.to_bytes()?;
		self.send_frame(&request).await
	}

	/// Writes one frame.
	///
	/// An oversized payload is refused before any byte is written, so the
	/// channel stays usable.
	pub async fn send_frame(&mut self, payload: &[u8]) -> TransportResult<()> {
		let header = encode_header(payload.len()).ok_or(TransportError::FrameTooLarge(payload.len() as u64))?;
		let result = match self.stream.as_mut() {
			Some(stream) => write_frame(stream, header, payload).await,
			None => Err(TransportError::Closed),
		};
		self.latch(result)
	}

	/// Reads one frame, bounded by the read timeout.
	pub async fn recv_frame(&mut self) -> TransportResult<Vec<u8>> {
		let result = match self.stream.as_mut() {
			Some(stream) => match tokio::time::timeout(self.read_timeout, read_frame(stream)).await {
				Ok(result) => result,
				Err(_) => Err(TransportError::Timeout(self.read_timeout)),
			},
			None => Err(TransportError::Closed),
		};
		self.latch(result)
	}

	/// Shuts the channel down. Safe to call repeatedly.
	pub async fn shutdown(&mut self) {
		if let Some(mut stream) = self.stream.take() {
			if let Err(err) = stream.shutdown().await {
				trace!(target = "privbridge.transport", error = %err, "shutdown after peer already gone");
			}
		}
	}

	fn latch<T>(&mut self, result: TransportResult<T>) -> TransportResult<T> {
		if let Err(err) = &result {
			if self.stream.take().is_some() {
				debug!(target = "privbridge.transport", error = %err, "transport failed; closing");
			}
		}
		result
	}
}

async fn write_frame<S>(stream: &mut S, header: [u8; FRAME_HEADER_LEN], payload: &[u8]) -> TransportResult<()>
where
	S: AsyncWrite + Unpin,
{
	stream.write_all(&header).await?;
	stream.write_all(payload).await?;
	stream.flush().await?;
	Ok(())
}

async fn read_frame<S>(stream: &mut S) -> TransportResult<Vec<u8>>
where
	S: AsyncRead + Unpin,
{
	let mut header = [0u8; FRAME_HEADER_LEN];
	stream.read_exact(&mut header).await?;
	let len = decode_header(header).map_err(|len| TransportError::FrameTooLarge(u64::from(len)))?;
	let mut payload = vec![0u8; len];
	stream.read_exact(&mut payload).await?;
	Ok(payload)
}

#[cfg(test)]
mod tests {
	use privbridge_protocol::RemoteError;
	use tokio::io::{DuplexStream, duplex};

	use super::*;

	const TIMEOUT: Duration = Duration::from_secs(5);

	fn pair() -> (ChannelTransport<DuplexStream>, ChannelTransport<DuplexStream>) {
		let (client, helper) = duplex(64 * 1024);
		(ChannelTransport::new(client, TIMEOUT), ChannelTransport::new(helper, TIMEOUT))
	}

	#[tokio::test]
	async fn call_round_trips_through_a_peer() {
		let (mut client, mut helper) = pair();

		let peer = tokio::spawn(async move {
			let request = helper.recv_frame().await.unwrap();
			let Envelope::Call(call) = Envelope::from_bytes(&request).unwrap() else {
				panic!("expected a call");
			};
			assert_eq!(call.payload, b"echo ok");
			helper.send_frame(&CallResult::reply("ok\n").to_bytes().unwrap()).await.unwrap();
		});

		let result = client.call(&Call::shell("echo ok")).await.unwrap();
		assert_eq!(result.reply_text().as_deref(), Some("ok\n"));
		peer.await.unwrap();
	}

	#[tokio::test]
	async fn remote_errors_arrive_as_results_not_failures() {
		let (mut client, mut helper) = pair();

		let peer = tokio::spawn(async move {
			helper.recv_frame().await.unwrap();
			let error = RemoteError {
				class_name: "SecurityException".into(),
				message: "denied".into(),
				stack: None,
			};
			helper.send_frame(&CallResult::failed(error).to_bytes().unwrap()).await.unwrap();
		});

		let result = client.call(&Call::shell("id")).await.unwrap();
		assert!(result.is_error());
		assert!(!client.is_closed());
		peer.await.unwrap();
	}

	#[tokio::test]
	async fn peer_hangup_is_broken_pipe_and_latches_closed() {
		let (mut client, helper) = pair();
		drop(helper);

		let err = client.call(&Call::shell("id")).await.unwrap_err();
		assert!(err.is_broken_pipe(), "{err:?}");
		assert!(client.is_closed());

		let err = client.call(&Call::shell("id")).await.unwrap_err();
		assert!(matches!(err, TransportError::Closed));
	}

	#[tokio::test]
	async fn silent_peer_times_out_without_broken_pipe() {
		let (client, _helper) = duplex(1024);
		let mut client = ChannelTransport::new(client, Duration::from_millis(50));

		let err = client.call(&Call::shell("sleep")).await.unwrap_err();
		assert!(matches!(err, TransportError::Timeout(_)));
		assert!(!err.is_broken_pipe());
		assert!(client.is_closed());
	}

	#[tokio::test]
	async fn oversized_incoming_frame_is_rejected() {
		let (client, mut helper) = duplex(1024);
		let mut client = ChannelTransport::new(client, TIMEOUT);
		helper.write_all(&[0xff; FRAME_HEADER_LEN]).await.unwrap();

		let err = client.recv_frame().await.unwrap_err();
		assert!(matches!(err, TransportError::FrameTooLarge(_)));
		assert!(client.is_closed());
	}

	#[tokio::test]
	async fn oversized_outgoing_frame_keeps_channel_open() {
		let (mut client, mut helper) = pair();

		let payload = vec![0u8; privbridge_protocol::MAX_FRAME_LEN as usize + 1];
		let err = client.send_frame(&payload).await.unwrap_err();
		assert!(matches!(err, TransportError::FrameTooLarge(_)));
		assert!(!err.is_broken_pipe());
		assert!(!client.is_closed());

		client.send_frame(b"next").await.unwrap();
		assert_eq!(helper.recv_frame().await.unwrap(), b"next");
	}

	#[tokio::test]
	async fn close_message_is_send_only() {
		let (mut client, mut helper) = pair();
		client.send_close().await.unwrap();
		let frame = helper.recv_frame().await.unwrap();
		assert_eq!(Envelope::from_bytes(&frame).unwrap(), Envelope::Close);
		assert!(!client.is_closed());
	}

	#[tokio::test]
	async fn shutdown_is_idempotent() {
		let (mut client, _helper) = pair();
		client.shutdown().await;
		client.shutdown().await;
		assert!(client.is_closed());
	}
}
