//! Bridge configuration.
//!
//! [`Preferences`] is the persisted, flag-shaped form the application edits.
//! [`BridgeConfig`] is the validated snapshot the manager and bootstrapper read.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Helper port for user 0. Other users are offset by their user id.
pub const DEFAULT_HELPER_PORT: u16 = 60001;
pub const DEFAULT_DEBUG_BRIDGE_HOST: &str = "127.0.0.1";
pub const DEFAULT_DEBUG_BRIDGE_PORT: u16 = 5555;
/// Where the provisioned launch script lives unless the state store says otherwise.
pub const DEFAULT_EXEC_PATH: &str = "/data/local/tmp/privbridge/run_server.sh";
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// How to get the helper process running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BootstrapStrategy {
	/// Launch through a root shell runner.
	Root,
	/// Type the launch command into a debug-bridge shell.
	DebugBridge {
		host: String,
		port: u16,
		/// Wrap the launch command in `su -c` inside the shell.
		#[serde(default)]
		as_root: bool,
	},
}

impl BootstrapStrategy {
	pub fn debug_bridge(host: impl Into<String>, port: u16) -> Self {
		BootstrapStrategy::DebugBridge {
			host: host.into(),
			port,
			as_root: false,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			BootstrapStrategy::Root => "root",
			BootstrapStrategy::DebugBridge { .. } => "debug_bridge",
		}
	}
}

/// Loopback address the helper listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperEndpoint {
	pub host: IpAddr,
	pub port: u16,
}

impl HelperEndpoint {
	/// Endpoint for `user_id`, offset from [`DEFAULT_HELPER_PORT`].
	pub fn for_user(user_id: u16) -> Self {
		Self {
			host: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port: DEFAULT_HELPER_PORT.saturating_add(user_id),
		}
	}

	pub fn socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}
}

impl Default for HelperEndpoint {
	fn default() -> Self {
		Self::for_user(0)
	}
}

/// Handshake attempts made after a bootstrap before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessProbe {
	pub attempts: u32,
	/// Wait between attempts.
	pub interval: Duration,
}

impl Default for ReadinessProbe {
	fn default() -> Self {
		Self {
			attempts: 1,
			interval: Duration::from_millis(500),
		}
	}
}

/// Validated bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
	/// Tried in order until one launches the helper.
	pub strategies: Vec<BootstrapStrategy>,
	pub helper: HelperEndpoint,
	/// Provisioned launch scripts; several are chained with `||`.
	pub exec_paths: Vec<PathBuf>,
	pub allow_background_helper: bool,
	/// Diagnostic log destination. When set, helper shell output is drained in full.
	pub log_path: Option<PathBuf>,
	pub settle_delay: Duration,
	pub connect_timeout: Duration,
	pub read_timeout: Duration,
	pub readiness: ReadinessProbe,
}

impl BridgeConfig {
	pub fn new(strategy: BootstrapStrategy) -> Self {
		Self {
			strategies: vec![strategy],
			helper: HelperEndpoint::default(),
			exec_paths: vec![PathBuf::from(DEFAULT_EXEC_PATH)],
			allow_background_helper: true,
			log_path: None,
			settle_delay: DEFAULT_SETTLE_DELAY,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			read_timeout: DEFAULT_READ_TIMEOUT,
			readiness: ReadinessProbe::default(),
		}
	}

	/// Builds a config from persisted preferences.
	///
	/// When both modes are enabled the debug bridge is tried first and root is
	/// the fallback. Enabling neither is a configuration error.
	pub fn from_preferences(prefs: &Preferences) -> Result<Self> {
		let debug_bridge = BootstrapStrategy::DebugBridge {
			host: prefs.debug_bridge_host.clone(),
			port: prefs.debug_bridge_port,
			as_root: prefs.root_over_debug_bridge,
		};
		let strategies = match (prefs.use_debug_bridge, prefs.use_root) {
			(true, true) => vec![debug_bridge, BootstrapStrategy::Root],
			(true, false) => vec![debug_bridge],
			(false, true) => vec![BootstrapStrategy::Root],
			(false, false) => return Err(Error::Config("neither root nor debug bridge is enabled".into())),
		};

		let config = Self {
			strategies,
			helper: HelperEndpoint::for_user(prefs.user_id),
			allow_background_helper: prefs.allow_background_helper,
			log_path: prefs.log_path.clone(),
			..Self::new(BootstrapStrategy::Root)
		};
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.strategies.is_empty() {
			return Err(Error::Config("no bootstrap strategy configured".into()));
		}
		for strategy in &self.strategies {
			if let BootstrapStrategy::DebugBridge { host, port, .. } = strategy {
				if host.trim().is_empty() {
					return Err(Error::Config("debug bridge host is empty".into()));
				}
				if *port == 0 {
					return Err(Error::Config("debug bridge port must be non-zero".into()));
				}
			}
		}
		if self.exec_paths.is_empty() || self.exec_paths.iter().any(|path| path.as_os_str().is_empty()) {
			return Err(Error::Config("helper exec path is empty".into()));
		}
		if !self.helper.host.is_loopback() {
			return Err(Error::Config(format!("helper host {} is not a loopback address", self.helper.host)));
		}
		if self.helper.port == 0 {
			return Err(Error::Config("helper port must be non-zero".into()));
		}
		if self.read_timeout.is_zero() || self.connect_timeout.is_zero() {
			return Err(Error::Config("timeouts must be non-zero".into()));
		}
		if self.readiness.attempts == 0 {
			return Err(Error::Config("readiness probe needs at least one attempt".into()));
		}
		Ok(())
	}

	/// Whether helper output should be kept instead of drained briefly.
	pub fn print_log(&self) -> bool {
		self.log_path.is_some()
	}
}

/// Persisted user preferences, in the flag form the settings screen edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
	pub use_root: bool,
	pub use_debug_bridge: bool,
	pub debug_bridge_host: String,
	pub debug_bridge_port: u16,
	pub root_over_debug_bridge: bool,
	pub allow_background_helper: bool,
	pub log_path: Option<PathBuf>,
	pub user_id: u16,
}

impl Default for Preferences {
	fn default() -> Self {
		Self {
			use_root: false,
			use_debug_bridge: false,
			debug_bridge_host: DEFAULT_DEBUG_BRIDGE_HOST.to_string(),
			debug_bridge_port: DEFAULT_DEBUG_BRIDGE_PORT,
			root_over_debug_bridge: false,
			allow_background_helper: true,
			log_path: None,
			user_id: 0,
		}
	}
}
