//! Bridge orchestration: one live session, started on demand.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex as StateCell;
use privbridge_protocol::{Call, CallResult};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bootstrap::Bootstrapper;
use crate::config::BridgeConfig;
use crate::error::{Error, HandshakeError, Result, TransportError};
use crate::session::Session;
use crate::store::StateStore;
use crate::token::Token;

/// Observable lifecycle of a [`BridgeManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
	Idle,
	Starting,
	Connected,
	Executing,
	Closing,
}

impl fmt::Display for BridgeState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			BridgeState::Idle => "idle",
			BridgeState::Starting => "starting",
			BridgeState::Connected => "connected",
			BridgeState::Executing => "executing",
			BridgeState::Closing => "closing",
		})
	}
}

struct Inner {
	config: BridgeConfig,
	session: Option<Session>,
	bootstrapper: Bootstrapper,
	/// Set while a call is on the wire. Still set on entry means the previous
	/// call was abandoned mid-exchange and the session's framing is unknown.
	call_in_flight: bool,
}

/// Owns at most one [`Session`] to the helper and serialises every use of it.
///
/// Construct one per process at the composition root and share it by
/// reference; all operations take `&self`.
pub struct BridgeManager {
	inner: Mutex<Inner>,
	state: StateCell<BridgeState>,
	store: Arc<StateStore>,
}

impl BridgeManager {
	pub fn new(config: BridgeConfig, store: Arc<StateStore>, bootstrapper: Bootstrapper) -> Result<Self> {
		config.validate()?;
		Ok(Self {
			inner: Mutex::new(Inner {
				config,
				session: None,
				bootstrapper,
				call_in_flight: false,
			}),
			state: StateCell::new(BridgeState::Idle),
			store,
		})
	}

	pub fn state(&self) -> BridgeState {
		*self.state.lock()
	}

	/// Whether a session is currently held and believed alive.
	pub fn is_running(&self) -> bool {
		matches!(self.state(), BridgeState::Connected | BridgeState::Executing)
	}

	pub fn store(&self) -> &Arc<StateStore> {
		&self.store
	}

	pub async fn config(&self) -> BridgeConfig {
		self.inner.lock().await.config.clone()
	}

	/// Replaces the configuration.
	///
	/// Waits for any in-flight call or bootstrap. A session to a different
	/// helper endpoint is closed, and a debug-bridge shell retained for the old
	/// strategies is released.
	pub async fn update_config(&self, config: BridgeConfig) -> Result<()> {
		config.validate()?;
		let mut inner = self.inner.lock().await;
		if inner.config.helper != config.helper {
			info!(target = "privbridge.manager", port = config.helper.port, "helper endpoint changed; dropping session");
			self.drop_session(&mut inner).await;
			self.set_state(BridgeState::Idle);
		}
		if inner.config.strategies != config.strategies {
			debug!(target = "privbridge.manager", "bootstrap strategies changed; releasing debug bridge shell");
			inner.bootstrapper.release().await;
		}
		inner.config = config;
		Ok(())
	}

	/// Ensures a session exists, launching the helper if needed.
	pub async fn start(&self) -> Result<()> {
		let mut inner = self.inner.lock().await;
		self.ensure_session(&mut inner).await
	}

	/// Sends `call` to the helper and returns its result.
	///
	/// A broken pipe rebuilds the session and retries once; the second failure
	/// is returned as is.
	pub async fn execute(&self, call: &Call) -> Result<CallResult> {
		let mut inner = self.inner.lock().await;
		self.ensure_session(&mut inner).await?;

		match self.call_once(&mut inner, call).await {
			Ok(result) => Ok(result),
			Err(err) if err.is_broken_pipe() => {
				warn!(target = "privbridge.manager", error = %err, "session broke mid-call; rebuilding once");
				self.drop_session(&mut inner).await;
				self.ensure_session(&mut inner).await?;
				Ok(self.call_once(&mut inner, call).await?)
			}
			Err(err) => Err(err.into()),
		}
	}

	/// Closes the session without asking the helper to exit. Idempotent.
	pub async fn stop(&self) {
		let mut inner = self.inner.lock().await;
		self.set_state(BridgeState::Closing);
		inner.bootstrapper.release().await;
		self.drop_session(&mut inner).await;
		self.set_state(BridgeState::Idle);
		debug!(target = "privbridge.manager", "bridge stopped");
	}

	pub async fn restart(&self) -> Result<()> {
		self.stop().await;
		self.start().await
	}

	/// Asks the helper to exit, then stops. Never fails.
	///
	/// Without a live session this authenticates a throwaway one, so a helper
	/// left running by an earlier process is stopped too. The helper is never
	/// launched just to be closed.
	pub async fn close_helper_and_stop(&self) {
		let mut inner = self.inner.lock().await;
		self.set_state(BridgeState::Closing);

		let abandoned = std::mem::take(&mut inner.call_in_flight);
		let live = inner.session.take().filter(|session| session.is_running() && !abandoned);
		let session = match live {
			Some(session) => Some(session),
			None => match self.store.current_token() {
				Some(token) => self.handshake(&inner.config, &token).await.ok(),
				None => None,
			},
		};

		if let Some(mut session) = session {
			match session.send_close().await {
				Ok(()) => info!(target = "privbridge.manager", "asked helper to exit"),
				Err(err) => debug!(target = "privbridge.manager", error = %err, "close request not delivered"),
			}
			session.close().await;
		} else {
			debug!(target = "privbridge.manager", "no helper reachable to close");
		}

		inner.bootstrapper.release().await;
		self.set_state(BridgeState::Idle);
	}

	async fn ensure_session(&self, inner: &mut Inner) -> Result<()> {
		if inner.call_in_flight {
			debug!(target = "privbridge.manager", "previous call was abandoned; discarding session");
			self.drop_session(inner).await;
		}
		if inner.session.as_ref().is_some_and(Session::is_running) {
			return Ok(());
		}
		self.drop_session(inner).await;

		self.set_state(BridgeState::Starting);
		let abandoned = AbandonGuard::new(self);
		let result = self.open_session(inner).await;
		abandoned.disarm();
		match result {
			Ok(session) => {
				inner.session = Some(session);
				self.set_state(BridgeState::Connected);
				Ok(())
			}
			Err(err) => {
				self.set_state(BridgeState::Idle);
				Err(err)
			}
		}
	}

	async fn open_session(&self, inner: &mut Inner) -> Result<Session> {
		let token = self.store.token()?;

		match self.handshake(&inner.config, &token).await {
			Ok(session) => {
				debug!(target = "privbridge.manager", "attached to running helper");
				return Ok(session);
			}
			Err(err) if err.is_unreachable() => {
				debug!(target = "privbridge.manager", error = %err, "helper not listening; bootstrapping");
			}
			Err(err) => return Err(err.into()),
		}

		inner.bootstrapper.launch(&inner.config, &token).await?;

		let probe = inner.config.readiness;
		let mut attempt = 1;
		loop {
			match self.handshake(&inner.config, &token).await {
				Ok(session) => {
					info!(target = "privbridge.manager", attempt, "helper started");
					return Ok(session);
				}
				Err(err) if err.is_unreachable() && attempt < probe.attempts => {
					debug!(target = "privbridge.manager", attempt, error = %err, "helper not ready yet");
					attempt += 1;
					tokio::time::sleep(probe.interval).await;
				}
				Err(err) => return Err(Error::HelperStart(err)),
			}
		}
	}

	async fn handshake(&self, config: &BridgeConfig, token: &Token) -> std::result::Result<Session, HandshakeError> {
		Session::connect(&config.helper, token, config.connect_timeout, config.read_timeout).await
	}

	async fn call_once(&self, inner: &mut Inner, call: &Call) -> std::result::Result<CallResult, TransportError> {
		let Some(session) = inner.session.as_mut() else {
			return Err(TransportError::Closed);
		};

		self.set_state(BridgeState::Executing);
		inner.call_in_flight = true;
		let abandoned = AbandonGuard::new(self);
		let result = session.call(call).await;
		abandoned.disarm();
		inner.call_in_flight = false;

		self.set_state(if session.is_running() { BridgeState::Connected } else { BridgeState::Idle });
		result
	}

	async fn drop_session(&self, inner: &mut Inner) {
		inner.call_in_flight = false;
		if let Some(mut session) = inner.session.take() {
			session.close().await;
		}
	}

	fn set_state(&self, next: BridgeState) {
		let mut state = self.state.lock();
		if *state != next {
			debug!(target = "privbridge.manager", from = %*state, to = %next, "state");
			*state = next;
		}
	}
}

/// Reports the bridge idle if the future driving a bootstrap or call is
/// dropped before it finishes. The session itself is discarded on next use.
struct AbandonGuard<'a> {
	manager: &'a BridgeManager,
	armed: bool,
}

impl<'a> AbandonGuard<'a> {
	fn new(manager: &'a BridgeManager) -> Self {
		Self { manager, armed: true }
	}

	fn disarm(mut self) {
		self.armed = false;
	}
}

impl Drop for AbandonGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			debug!(target = "privbridge.manager", "operation abandoned mid-flight");
			self.manager.set_state(BridgeState::Idle);
		}
	}
}

impl fmt::Debug for BridgeManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BridgeManager").field("state", &self.state()).finish_non_exhaustive()
	}
}
