use privbridge::RemoteError;
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Bridge(#[from] privbridge::Error),

	#[error("helper reported {0}")]
	Remote(RemoteError),

	#[error("{0}")]
	InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

impl From<&CliError> for CommandError {
	fn from(err: &CliError) -> Self {
		match err {
			CliError::Bridge(err) => CommandError {
				code: ErrorCode::for_phase(err.phase()),
				message: err.to_string(),
				details: None,
			},
			CliError::Remote(remote) => CommandError::from(remote),
			CliError::InvalidInput(message) => CommandError {
				code: ErrorCode::InvalidInput,
				message: message.clone(),
				details: None,
			},
		}
	}
}
