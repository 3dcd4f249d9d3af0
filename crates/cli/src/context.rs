//! Shared state for one CLI invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use privbridge::{Bootstrapper, BridgeConfig, BridgeManager, Preferences, StateStore};

use crate::error::Result;

pub struct CommandContext {
	store: Arc<StateStore>,
	state_path: PathBuf,
}

impl CommandContext {
	/// Opens the state file in `state_dir`, or in the default location.
	pub fn open(state_dir: Option<&Path>) -> anyhow::Result<Self> {
		let state_path = match state_dir {
			Some(dir) => StateStore::path_in(dir),
			None => StateStore::default_path().context("cannot determine a config directory; pass --state-dir")?,
		};
		let store = StateStore::open(&state_path).with_context(|| format!("failed to open state at {}", state_path.display()))?;
		Ok(Self {
			store: Arc::new(store),
			state_path,
		})
	}

	pub fn store(&self) -> &Arc<StateStore> {
		&self.store
	}

	pub fn state_path(&self) -> &Path {
		&self.state_path
	}

	pub fn preferences(&self) -> Preferences {
		self.store.preferences()
	}

	/// Bridge config from preferences, with the provisioned exec path applied.
	pub fn bridge_config(&self) -> Result<BridgeConfig> {
		let mut config = BridgeConfig::from_preferences(&self.preferences())?;
		if let Some(path) = self.store.exec_path() {
			config.exec_paths = vec![path];
		}
		config.validate()?;
		Ok(config)
	}

	pub fn manager(&self) -> Result<BridgeManager> {
		let config = self.bridge_config()?;
		Ok(BridgeManager::new(config, Arc::clone(&self.store), Bootstrapper::system())?)
	}
}
