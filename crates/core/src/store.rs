//! Persisted bridge state: the shared token, the provisioned exec path, and
//! the user's bootstrap preferences.
//!
//! Stored as one small JSON file under the user's config directory
//! (`~/.config/privbridge/state.json` on Linux).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Preferences;
use crate::error::{Error, Result};
use crate::token::Token;

const STATE_SCHEMA_VERSION: u32 = 1;
const STATE_FILE_NAME: &str = "state.json";

/// On-disk format of the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFile {
	pub schema: u32,
	#[serde(default)]
	pub local_token: Option<Token>,
	#[serde(default)]
	pub exec_path: Option<PathBuf>,
	#[serde(default)]
	pub preferences: Preferences,
}

impl Default for StateFile {
	fn default() -> Self {
		Self {
			schema: STATE_SCHEMA_VERSION,
			local_token: None,
			exec_path: None,
			preferences: Preferences::default(),
		}
	}
}

/// Key-value store backing the bridge's install-scoped state.
///
/// All access goes through one lock, so concurrent first-time callers of
/// [`StateStore::token`] agree on a single generated token.
#[derive(Debug)]
pub struct StateStore {
	path: Option<PathBuf>,
	file: Mutex<StateFile>,
}

impl StateStore {
	/// Default location under the platform config directory.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("privbridge").join(STATE_FILE_NAME))
	}

	/// State file inside `dir`.
	pub fn path_in(dir: &Path) -> PathBuf {
		dir.join(STATE_FILE_NAME)
	}

	/// Opens the store at `path`. A missing file is an empty store.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		let file = match fs::read_to_string(&path) {
			Ok(content) => serde_json::from_str(&content).map_err(|source| Error::StoreCorrupt { path: path.clone(), source })?,
			Err(err) if err.kind() == io::ErrorKind::NotFound => StateFile::default(),
			Err(source) => return Err(Error::Store { path, source }),
		};
		debug!(target = "privbridge.store", path = %path.display(), "state loaded");
		Ok(Self {
			path: Some(path),
			file: Mutex::new(file),
		})
	}

	/// Store that never touches disk.
	pub fn in_memory() -> Self {
		Self {
			path: None,
			file: Mutex::new(StateFile::default()),
		}
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Returns the persisted token, generating and saving one on first use.
	pub fn token(&self) -> Result<Token> {
		let mut file = self.file.lock();
		if let Some(token) = file.local_token.as_ref().filter(|token| !token.is_empty()) {
			return Ok(token.clone());
		}
		let token = Token::generate();
		file.local_token = Some(token.clone());
		self.save(&file)?;
		info!(target = "privbridge.store", "generated new helper token");
		Ok(token)
	}

	/// The persisted token, if any, without generating one.
	pub fn current_token(&self) -> Option<Token> {
		self.file.lock().local_token.clone().filter(|token| !token.is_empty())
	}

	/// Replaces the token, e.g. with one paired manually on the helper side.
	pub fn set_token(&self, token: Token) -> Result<()> {
		let mut file = self.file.lock();
		file.local_token = Some(token);
		self.save(&file)
	}

	/// Forgets the token. The next [`StateStore::token`] call generates a new one.
	pub fn clear_token(&self) -> Result<()> {
		let mut file = self.file.lock();
		file.local_token = None;
		self.save(&file)
	}

	pub fn exec_path(&self) -> Option<PathBuf> {
		self.file.lock().exec_path.clone()
	}

	pub fn set_exec_path(&self, path: Option<PathBuf>) -> Result<()> {
		let mut file = self.file.lock();
		file.exec_path = path;
		self.save(&file)
	}

	pub fn preferences(&self) -> Preferences {
		self.file.lock().preferences.clone()
	}

	pub fn set_preferences(&self, preferences: Preferences) -> Result<()> {
		let mut file = self.file.lock();
		file.preferences = preferences;
		self.save(&file)
	}

	fn save(&self, file: &StateFile) -> Result<()> {
		let Some(path) = &self.path else {
			return Ok(());
		};
		let store_err = |source| Error::Store { path: path.clone(), source };
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).map_err(store_err)?;
		}
		let json = serde_json::to_string_pretty(file).map_err(|source| Error::StoreCorrupt { path: path.clone(), source })?;
		fs::write(path, json).map_err(store_err)?;
		Ok(())
	}
}
