//! Client side of a privileged-command bridge.
//!
//! An unprivileged process cannot perform privileged operations itself, so it
//! hands them to a helper process running with elevated rights. This crate
//! launches that helper (through a root shell or a debug-bridge shell),
//! authenticates to it over loopback with a shared token, and moves opaque
//! [`Call`]s and [`CallResult`]s across the channel.
//!
//! ```ignore
//! let store = Arc::new(StateStore::open(StateStore::default_path().unwrap())?);
//! let config = BridgeConfig::from_preferences(&store.preferences())?;
//! let manager = BridgeManager::new(config, store, Bootstrapper::system())?;
//!
//! let result = manager.execute(&Call::shell("id")).await?;
//! println!("{}", result.reply_text().unwrap_or_default());
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod manager;
pub mod session;
pub mod store;
pub mod token;
pub mod transport;

pub use bootstrap::{AlreadyProvisioned, Bootstrapper, DRAIN_LINE_LIMIT, Provisioner, READY_MARKER};
pub use config::{BootstrapStrategy, BridgeConfig, HelperEndpoint, Preferences, ReadinessProbe};
pub use error::{BootstrapError, Error, HandshakeError, Phase, Result, TransportError};
pub use manager::{BridgeManager, BridgeState};
pub use privbridge_protocol::{Call, CallKind, CallResult, RemoteError};
pub use {privbridge_protocol as protocol, privbridge_runtime as runtime};
pub use session::Session;
pub use store::StateStore;
pub use token::Token;
pub use transport::ChannelTransport;
