//! Helper launch command construction.
//!
//! The helper expects exactly `sh <exec-path> <port> <token>`. When more than
//! one provisioned copy of the exec script exists the invocations are chained
//! with `||`, so a copy on storage the shell user cannot read falls through to
//! the next one.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

const REDACTED_TOKEN: &str = "<token>";

/// Command line that starts the helper listening on `port`.
#[derive(Clone, PartialEq, Eq)]
pub struct LaunchCommand {
	exec_paths: Vec<PathBuf>,
	port: u16,
	token: String,
}

impl LaunchCommand {
	pub fn new(exec_paths: Vec<PathBuf>, port: u16, token: impl Into<String>) -> Self {
		Self {
			exec_paths,
			port,
			token: token.into(),
		}
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn exec_paths(&self) -> &[PathBuf] {
		&self.exec_paths
	}

	/// Full command text, token included.
	pub fn render(&self) -> String {
		self.render_with(&self.token)
	}

	/// Command wrapped for a non-root shell that can still `su`.
	pub fn as_root(&self) -> String {
		format!("su -c {}", quote(&self.render()))
	}

	/// Command text safe for logs.
	pub fn redacted(&self) -> String {
		self.render_with(REDACTED_TOKEN)
	}

	fn render_with(&self, token: &str) -> String {
		self.exec_paths
			.iter()
			.map(|path| format!("sh {} {} {}", quote(&path.to_string_lossy()), self.port, quote(token)))
			.collect::<Vec<_>>()
			.join(" || ")
	}
}

impl fmt::Debug for LaunchCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("LaunchCommand").field(&self.redacted()).finish()
	}
}

fn quote(text: &str) -> Cow<'_, str> {
	shlex::try_quote(text).unwrap_or(Cow::Borrowed(text))
}
