//! In-process stand-ins for the helper and its launchers.

#![allow(dead_code)]

use std::io;
use std::net::TcpListener as StdListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use privbridge::protocol::{Envelope, Hello};
use privbridge::runtime::{DebugBridgeClient, DebugBridgeConnection, ShellOutput, ShellRunner, ShellStream};
use privbridge::{BootstrapStrategy, Bootstrapper, BridgeConfig, BridgeManager, CallKind, CallResult, ChannelTransport, RemoteError, StateStore, Token};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const TOKEN: &str = "amber-river-stone";
const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// How the fake helper treats each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
	/// Answer every call.
	Serve,
	/// Hang up as soon as a call arrives, on every connection.
	HangUpOnCall,
	/// Hang up on the first call of the first connection only.
	HangUpOnFirstCall,
}

#[derive(Debug, Default)]
pub struct HelperStats {
	pub connections: AtomicUsize,
	pub calls: AtomicUsize,
	pub close_requests: AtomicUsize,
}

/// Fake elevated helper listening on loopback. Dropping it ends the helper,
/// including connections already accepted.
pub struct FakeHelper {
	pub port: u16,
	pub stats: Arc<HelperStats>,
	task: JoinHandle<()>,
	connections: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl FakeHelper {
	pub async fn spawn(token: &str, behavior: Behavior) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		Self::serve(listener, token.to_string(), behavior)
	}

	pub async fn spawn_on(port: u16, token: &str, behavior: Behavior) -> io::Result<Self> {
		let listener = TcpListener::bind(("127.0.0.1", port)).await?;
		Ok(Self::serve(listener, token.to_string(), behavior))
	}

	fn serve(listener: TcpListener, token: String, behavior: Behavior) -> Self {
		let port = listener.local_addr().unwrap().port();
		let stats = Arc::new(HelperStats::default());
		let connections = Arc::new(Mutex::new(Vec::new()));
		let task = tokio::spawn({
			let stats = Arc::clone(&stats);
			let connections = Arc::clone(&connections);
			async move {
				while let Ok((stream, _)) = listener.accept().await {
					let index = stats.connections.fetch_add(1, Ordering::SeqCst);
					let hang_up = match behavior {
						Behavior::Serve => false,
						Behavior::HangUpOnCall => true,
						Behavior::HangUpOnFirstCall => index == 0,
					};
					let connection = tokio::spawn(handle_connection(stream, token.clone(), hang_up, Arc::clone(&stats)));
					connections.lock().push(connection);
				}
			}
		});
		Self {
			port,
			stats,
			task,
			connections,
		}
	}

	pub fn connections(&self) -> usize {
		self.stats.connections.load(Ordering::SeqCst)
	}

	pub fn calls(&self) -> usize {
		self.stats.calls.load(Ordering::SeqCst)
	}

	pub fn close_requests(&self) -> usize {
		self.stats.close_requests.load(Ordering::SeqCst)
	}
}

impl Drop for FakeHelper {
	fn drop(&mut self) {
		self.task.abort();
		for connection in self.connections.lock().drain(..) {
			connection.abort();
		}
	}
}

async fn handle_connection(stream: TcpStream, token: String, hang_up: bool, stats: Arc<HelperStats>) {
	let mut channel = ChannelTransport::new(stream, IO_TIMEOUT);

	let Ok(hello) = channel.recv_frame().await else { return };
	match Hello::parse(&hello) {
		Some(hello) if hello.token == token => {
			if channel.send_frame(&Hello::new(token).to_bytes()).await.is_err() {
				return;
			}
		}
		_ => return,
	}

	while let Ok(frame) = channel.recv_frame().await {
		match Envelope::from_bytes(&frame) {
			Ok(Envelope::Call(call)) => {
				stats.calls.fetch_add(1, Ordering::SeqCst);
				if hang_up {
					return;
				}
				let result = match call.kind {
					CallKind::Shell => run_shell(&String::from_utf8_lossy(&call.payload)).await,
					_ => CallResult::failed(RemoteError {
						class_name: "java.lang.UnsupportedOperationException".into(),
						message: "no processor for call".into(),
						stack: None,
					}),
				};
				if channel.send_frame(&result.to_bytes().unwrap()).await.is_err() {
					return;
				}
			}
			Ok(Envelope::Close) => {
				stats.close_requests.fetch_add(1, Ordering::SeqCst);
				return;
			}
			Err(_) => return,
		}
	}
}

#[cfg(unix)]
async fn run_shell(command: &str) -> CallResult {
	match tokio::process::Command::new("sh").arg("-c").arg(command).output().await {
		Ok(output) => CallResult::reply(output.stdout),
		Err(err) => CallResult::failed(RemoteError {
			class_name: "java.io.IOException".into(),
			message: err.to_string(),
			stack: None,
		}),
	}
}

#[cfg(not(unix))]
async fn run_shell(command: &str) -> CallResult {
	CallResult::reply(format!("{command}\n"))
}

/// Root runner that starts a [`FakeHelper`] when handed the launch command.
pub struct FakeRoot {
	pub granted: bool,
	/// Whether running the launch command actually brings a helper up.
	pub starts_helper: bool,
	pub behavior: Behavior,
	pub commands: Mutex<Vec<String>>,
	pub helpers: Mutex<Vec<FakeHelper>>,
}

impl FakeRoot {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::base())
	}

	pub fn denied() -> Arc<Self> {
		Arc::new(Self {
			granted: false,
			..Self::base()
		})
	}

	pub fn silent() -> Arc<Self> {
		Arc::new(Self {
			starts_helper: false,
			..Self::base()
		})
	}

	fn base() -> Self {
		Self {
			granted: true,
			starts_helper: true,
			behavior: Behavior::Serve,
			commands: Mutex::new(Vec::new()),
			helpers: Mutex::new(Vec::new()),
		}
	}

	pub fn launches(&self) -> usize {
		self.commands.lock().len()
	}
}

#[async_trait]
impl ShellRunner for FakeRoot {
	async fn has_root(&self) -> bool {
		self.granted
	}

	async fn run(&self, command: &str) -> ShellOutput {
		self.commands.lock().push(command.to_string());
		if !self.starts_helper {
			return ShellOutput {
				success: true,
				output: String::new(),
			};
		}

		// sh <exec-path> <port> <token>
		let args: Vec<&str> = command.split_whitespace().collect();
		let (Some(port), Some(token)) = (args.get(2).and_then(|port| port.parse::<u16>().ok()), args.get(3)) else {
			return ShellOutput::failed(format!("unexpected launch command: {command}"));
		};
		match FakeHelper::spawn_on(port, token, self.behavior).await {
			Ok(helper) => {
				self.helpers.lock().push(helper);
				ShellOutput {
					success: true,
					output: String::new(),
				}
			}
			Err(err) => ShellOutput::failed(err.to_string()),
		}
	}
}

/// Debug-bridge client whose daemon is never running.
#[derive(Default)]
pub struct DeadDebugBridge {
	pub attempts: AtomicUsize,
}

#[async_trait]
impl DebugBridgeClient for DeadDebugBridge {
	async fn connect(&self, host: &str, port: u16) -> io::Result<Box<dyn DebugBridgeConnection>> {
		self.attempts.fetch_add(1, Ordering::SeqCst);
		Err(io::Error::new(io::ErrorKind::ConnectionRefused, format!("{host}:{port}: connection refused")))
	}
}

/// Debug-bridge client whose daemons all accept, handing out shells that
/// swallow input and print nothing.
#[derive(Default)]
pub struct RecordingDebugBridge {
	pub connects: Mutex<Vec<String>>,
}

#[async_trait]
impl DebugBridgeClient for RecordingDebugBridge {
	async fn connect(&self, host: &str, port: u16) -> io::Result<Box<dyn DebugBridgeConnection>> {
		self.connects.lock().push(format!("{host}:{port}"));
		Ok(Box::new(QuietConnection))
	}
}

struct QuietConnection;

#[async_trait]
impl DebugBridgeConnection for QuietConnection {
	async fn open_shell(&self) -> io::Result<Arc<dyn ShellStream>> {
		Ok(Arc::new(QuietShell::default()))
	}

	async fn close(&self) -> io::Result<()> {
		Ok(())
	}
}

#[derive(Default)]
struct QuietShell {
	closed: AtomicBool,
}

#[async_trait]
impl ShellStream for QuietShell {
	async fn write(&self, _bytes: &[u8]) -> io::Result<()> {
		Ok(())
	}

	async fn read_line(&self) -> io::Result<Option<String>> {
		Ok(None)
	}

	fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	async fn close(&self) -> io::Result<()> {
		self.closed.store(true, Ordering::SeqCst);
		Ok(())
	}
}

/// A loopback port with nothing listening on it.
pub fn free_port() -> u16 {
	let listener = StdListener::bind("127.0.0.1:0").unwrap();
	listener.local_addr().unwrap().port()
}

pub fn config(strategy: BootstrapStrategy, port: u16) -> BridgeConfig {
	let mut config = BridgeConfig::new(strategy);
	config.helper.port = port;
	config.exec_paths = vec!["/data/local/tmp/privbridge/run_server.sh".into()];
	config.settle_delay = Duration::ZERO;
	config.connect_timeout = Duration::from_secs(2);
	config.read_timeout = IO_TIMEOUT;
	config
}

pub fn store_with_token(token: &str) -> Arc<StateStore> {
	let store = StateStore::in_memory();
	store.set_token(Token::new(token)).unwrap();
	Arc::new(store)
}

pub fn manager(config: BridgeConfig, store: Arc<StateStore>, root: Arc<FakeRoot>, debug_bridge: Arc<DeadDebugBridge>) -> BridgeManager {
	BridgeManager::new(config, store, Bootstrapper::new(root, debug_bridge)).unwrap()
}
