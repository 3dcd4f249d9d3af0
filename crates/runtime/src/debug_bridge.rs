//! Debug-bridge shell access.
//!
//! The bridge only needs three things from a debug-bridge client: connect to a
//! daemon, open an interactive shell, and push lines into it while something
//! else drains its output. [`AdbCli`] provides that on top of the platform
//! `adb` binary.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::debug;

/// Entry point for opening debug-bridge connections.
#[async_trait]
pub trait DebugBridgeClient: Send + Sync {
	async fn connect(&self, host: &str, port: u16) -> io::Result<Box<dyn DebugBridgeConnection>>;
}

/// A connection to a debug-bridge daemon.
#[async_trait]
pub trait DebugBridgeConnection: Send + Sync {
	async fn open_shell(&self) -> io::Result<Arc<dyn ShellStream>>;

	async fn close(&self) -> io::Result<()>;
}

/// Interactive shell on the far side of a debug-bridge connection.
///
/// Reads and writes may happen concurrently from different tasks.
#[async_trait]
pub trait ShellStream: Send + Sync {
	async fn write(&self, bytes: &[u8]) -> io::Result<()>;

	/// Next output line without its terminator, or `None` at end of stream.
	async fn read_line(&self) -> io::Result<Option<String>>;

	fn is_closed(&self) -> bool;

	async fn close(&self) -> io::Result<()>;
}

/// [`DebugBridgeClient`] that drives the `adb` command-line tool.
#[derive(Debug, Clone)]
pub struct AdbCli {
	adb: PathBuf,
}

impl AdbCli {
	/// Finds `adb` on `PATH`.
	pub fn locate() -> io::Result<Self> {
		let adb = which::which("adb").map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("adb not found: {e}")))?;
		Ok(Self { adb })
	}

	pub fn with_binary(adb: impl Into<PathBuf>) -> Self {
		Self { adb: adb.into() }
	}
}

#[async_trait]
impl DebugBridgeClient for AdbCli {
	async fn connect(&self, host: &str, port: u16) -> io::Result<Box<dyn DebugBridgeConnection>> {
		let serial = format!("{host}:{port}");
		let output = Command::new(&self.adb).args(["connect", &serial]).stdin(Stdio::null()).output().await?;
		let stdout = String::from_utf8_lossy(&output.stdout);

		// adb exits 0 even when the daemon refuses; only the message tells.
		if !output.status.success() || !stdout.contains("connected to") {
			let stderr = String::from_utf8_lossy(&output.stderr);
			let reason = if stdout.trim().is_empty() { stderr.trim() } else { stdout.trim() };
			return Err(io::Error::new(io::ErrorKind::ConnectionRefused, format!("adb connect {serial}: {reason}")));
		}

		debug!(target = "privbridge.adb", %serial, "debug bridge connected");
		Ok(Box::new(AdbCliConnection { adb: self.adb.clone(), serial }))
	}
}

struct AdbCliConnection {
	adb: PathBuf,
	serial: String,
}

#[async_trait]
impl DebugBridgeConnection for AdbCliConnection {
	async fn open_shell(&self) -> io::Result<Arc<dyn ShellStream>> {
		Ok(Arc::new(self.spawn_shell()?))
	}

	async fn close(&self) -> io::Result<()> {
		Command::new(&self.adb).args(["disconnect", &self.serial]).stdin(Stdio::null()).output().await?;
		Ok(())
	}
}

impl AdbCliConnection {
	fn spawn_shell(&self) -> io::Result<AdbCliShell> {
		let mut child = Command::new(&self.adb)
			.args(["-s", &self.serial, "shell"])
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.kill_on_drop(true)
			.spawn()?;

		let stdin = child.stdin.take().ok_or_else(|| io::Error::other("adb shell stdin unavailable"))?;
		let stdout = child.stdout.take().ok_or_else(|| io::Error::other("adb shell stdout unavailable"))?;

		Ok(AdbCliShell {
			stdin: Mutex::new(Some(stdin)),
			stdout: Mutex::new(BufReader::new(stdout)),
			child: Mutex::new(child),
			closed: AtomicBool::new(false),
		})
	}
}

struct AdbCliShell {
	stdin: Mutex<Option<ChildStdin>>,
	stdout: Mutex<BufReader<ChildStdout>>,
	child: Mutex<Child>,
	closed: AtomicBool,
}

#[async_trait]
impl ShellStream for AdbCliShell {
	async fn write(&self, bytes: &[u8]) -> io::Result<()> {
		let mut stdin = self.stdin.lock().await;
		let Some(pipe) = stdin.as_mut() else {
			return Err(io::Error::new(io::ErrorKind::BrokenPipe, "adb shell closed"));
		};
		let result = async {
			pipe.write_all(bytes).await?;
			pipe.flush().await
		}
		.await;
		if result.is_err() {
			self.closed.store(true, Ordering::SeqCst);
		}
		result
	}

	async fn read_line(&self) -> io::Result<Option<String>> {
		let mut stdout = self.stdout.lock().await;
		let mut line = String::new();
		if stdout.read_line(&mut line).await? == 0 {
			self.closed.store(true, Ordering::SeqCst);
			return Ok(None);
		}
		let trimmed = line.trim_end_matches(['\r', '\n']).len();
		line.truncate(trimmed);
		Ok(Some(line))
	}

	fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	async fn close(&self) -> io::Result<()> {
		self.closed.store(true, Ordering::SeqCst);
		self.stdin.lock().await.take();
		let mut child = self.child.lock().await;
		// Kills and reaps; an already reaped child reports InvalidInput.
		match child.kill().await {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
			Err(err) => Err(err),
		}
	}
}
