//! Getting the elevated helper process running.
//!
//! Two ways in: hand the launch command to a root shell runner, or type it
//! into a debug-bridge shell. Either way the bootstrapper keeps no handle on
//! the helper itself; the helper exits when asked over its own channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use privbridge_runtime::{AdbCli, DebugBridgeClient, DebugBridgeConnection, LaunchCommand, ShellRunner, ShellStream, SuShellRunner};
use tracing::{debug, info, warn};

use crate::config::{BootstrapStrategy, BridgeConfig};
use crate::error::BootstrapError;
use crate::token::Token;

/// Helper output line announcing it is about to serve.
pub const READY_MARKER: &str = "runGet";
/// Shell output lines drained before giving up on the ready marker.
pub const DRAIN_LINE_LIMIT: usize = 50;
const SHELL_WRITE_PAUSE: Duration = Duration::from_millis(100);

/// Puts the helper's launch script in place before each launch.
#[async_trait]
pub trait Provisioner: Send + Sync {
	async fn prepare(&self, config: &BridgeConfig) -> Result<(), BootstrapError>;
}

/// [`Provisioner`] for installs where the exec script is already in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlreadyProvisioned;

#[async_trait]
impl Provisioner for AlreadyProvisioned {
	async fn prepare(&self, _config: &BridgeConfig) -> Result<(), BootstrapError> {
		Ok(())
	}
}

/// Launches the helper using the strategies a [`BridgeConfig`] lists.
pub struct Bootstrapper {
	shell: Arc<dyn ShellRunner>,
	debug_bridge: Arc<dyn DebugBridgeClient>,
	provisioner: Arc<dyn Provisioner>,
	connection: Option<Box<dyn DebugBridgeConnection>>,
	stream: Option<Arc<dyn ShellStream>>,
}

impl Bootstrapper {
	pub fn new(shell: Arc<dyn ShellRunner>, debug_bridge: Arc<dyn DebugBridgeClient>) -> Self {
		Self {
			shell,
			debug_bridge,
			provisioner: Arc::new(AlreadyProvisioned),
			connection: None,
			stream: None,
		}
	}

	/// Bootstrapper backed by the system `su` and `adb` binaries.
	pub fn system() -> Self {
		let adb = AdbCli::locate().unwrap_or_else(|_| AdbCli::with_binary("adb"));
		Self::new(Arc::new(SuShellRunner::new()), Arc::new(adb))
	}

	pub fn with_provisioner(mut self, provisioner: Arc<dyn Provisioner>) -> Self {
		self.provisioner = provisioner;
		self
	}

	/// Whether a debug-bridge shell from an earlier launch is still open.
	pub fn has_open_shell(&self) -> bool {
		self.stream.as_ref().is_some_and(|stream| !stream.is_closed())
	}

	/// Launches the helper, trying each configured strategy in order.
	///
	/// Returns the last strategy's error when none succeeds.
	pub async fn launch(&mut self, config: &BridgeConfig, token: &Token) -> Result<(), BootstrapError> {
		self.provisioner.prepare(config).await?;
		let command = LaunchCommand::new(config.exec_paths.clone(), config.helper.port, token.expose());

		let mut last_err = None;
		for strategy in &config.strategies {
			info!(target = "privbridge.bootstrap", strategy = strategy.name(), command = %command.redacted(), "launching helper");
			let result = match strategy {
				BootstrapStrategy::Root => self.launch_root(config, &command).await,
				BootstrapStrategy::DebugBridge { host, port, as_root } => self.launch_debug_bridge(host, *port, *as_root, config, &command, token).await,
			};
			match result {
				Ok(()) => {
					info!(target = "privbridge.bootstrap", strategy = strategy.name(), "helper launched");
					return Ok(());
				}
				Err(err) => {
					warn!(target = "privbridge.bootstrap", strategy = strategy.name(), error = %err, "helper launch failed");
					last_err = Some(err);
				}
			}
		}
		Err(last_err.unwrap_or(BootstrapError::LaunchFailed {
			output: "no bootstrap strategy configured".into(),
		}))
	}

	async fn launch_root(&self, config: &BridgeConfig, command: &LaunchCommand) -> Result<(), BootstrapError> {
		if !self.shell.has_root().await {
			return Err(BootstrapError::RootDenied);
		}

		let output = self.shell.run(&command.render()).await;
		debug!(target = "privbridge.bootstrap", success = output.success, output = %output.output.trim_end(), "root launch finished");
		if !output.success {
			return Err(BootstrapError::LaunchFailed { output: output.output });
		}

		tokio::time::sleep(config.settle_delay).await;
		Ok(())
	}

	async fn launch_debug_bridge(&mut self, host: &str, port: u16, as_root: bool, config: &BridgeConfig, command: &LaunchCommand, token: &Token) -> Result<(), BootstrapError> {
		let stream = match self.stream.clone().filter(|stream| !stream.is_closed()) {
			Some(stream) => {
				debug!(target = "privbridge.bootstrap", "reusing open debug bridge shell");
				stream
			}
			None => self.open_shell(host, port, config, token).await?,
		};

		let line = if as_root { command.as_root() } else { command.render() };
		let writes: [&[u8]; 2] = [b"\n\n", b"id\n"];
		for bytes in writes {
			stream.write(bytes).await.map_err(BootstrapError::ShellWrite)?;
			tokio::time::sleep(SHELL_WRITE_PAUSE).await;
		}
		stream.write(format!("{line}\n").as_bytes()).await.map_err(BootstrapError::ShellWrite)?;

		tokio::time::sleep(config.settle_delay).await;
		Ok(())
	}

	async fn open_shell(&mut self, host: &str, port: u16, config: &BridgeConfig, token: &Token) -> Result<Arc<dyn ShellStream>, BootstrapError> {
		self.release().await;

		debug!(target = "privbridge.bootstrap", %host, port, "connecting to debug bridge");
		let connection = self.debug_bridge.connect(host, port).await.map_err(|source| BootstrapError::DebugBridgeConnect {
			host: host.to_string(),
			port,
			source,
		})?;

		let stream = match connection.open_shell().await {
			Ok(stream) => stream,
			Err(err) => {
				if let Err(close_err) = connection.close().await {
					debug!(target = "privbridge.bootstrap", error = %close_err, "failed to close debug bridge connection");
				}
				return Err(BootstrapError::OpenShell(err));
			}
		};

		spawn_drain(Arc::clone(&stream), config.print_log(), token.expose().to_string());
		self.connection = Some(connection);
		self.stream = Some(Arc::clone(&stream));
		Ok(stream)
	}

	/// Closes the retained debug-bridge shell and its connection, if any.
	pub async fn release(&mut self) {
		if let Some(stream) = self.stream.take() {
			if let Err(err) = stream.close().await {
				debug!(target = "privbridge.bootstrap", error = %err, "failed to close debug bridge shell");
			}
		}
		if let Some(connection) = self.connection.take() {
			if let Err(err) = connection.close().await {
				debug!(target = "privbridge.bootstrap", error = %err, "failed to close debug bridge connection");
			}
		}
	}
}

impl std::fmt::Debug for Bootstrapper {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Bootstrapper").field("has_open_shell", &self.has_open_shell()).finish_non_exhaustive()
	}
}

/// Logs the shell's output in the background so the stream never backs up.
///
/// Stops after [`DRAIN_LINE_LIMIT`] lines or the ready marker unless
/// `keep_all` is set, in which case it runs until the stream closes.
fn spawn_drain(stream: Arc<dyn ShellStream>, keep_all: bool, token: String) -> tokio::task::JoinHandle<usize> {
	tokio::spawn(async move {
		let mut lines = 0usize;
		while !stream.is_closed() {
			match stream.read_line().await {
				Ok(Some(line)) => {
					lines += 1;
					let line = line.replace(&token, "<token>");
					debug!(target = "privbridge.helper", %line);
					if !keep_all && (lines >= DRAIN_LINE_LIMIT || line.starts_with(READY_MARKER)) {
						break;
					}
				}
				Ok(None) => break,
				Err(err) => {
					debug!(target = "privbridge.helper", error = %err, "stopped reading helper output");
					break;
				}
			}
		}
		lines
	})
}
