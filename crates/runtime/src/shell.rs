//! Privileged shell-command execution.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Outcome of a shell command run through a [`ShellRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
	pub success: bool,
	/// Combined stdout and stderr.
	pub output: String,
}

impl ShellOutput {
	pub fn failed(output: impl Into<String>) -> Self {
		Self {
			success: false,
			output: output.into(),
		}
	}
}

/// Runs commands with root privileges.
#[async_trait]
pub trait ShellRunner: Send + Sync {
	/// Whether root has been granted to this process.
	async fn has_root(&self) -> bool;

	/// Runs `command` as root. Spawn failures are reported as unsuccessful output.
	async fn run(&self, command: &str) -> ShellOutput;
}

/// [`ShellRunner`] backed by the `su` binary.
#[derive(Debug, Clone)]
pub struct SuShellRunner {
	su: PathBuf,
}

impl SuShellRunner {
	/// Uses the first `su` on `PATH`, or plain `su` if none is found.
	pub fn new() -> Self {
		let su = which::which("su").unwrap_or_else(|_| PathBuf::from("su"));
		Self { su }
	}

	pub fn with_binary(su: impl Into<PathBuf>) -> Self {
		Self { su: su.into() }
	}
}

impl Default for SuShellRunner {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ShellRunner for SuShellRunner {
	async fn has_root(&self) -> bool {
		let result = self.run("id").await;
		result.success && result.output.contains("uid=0")
	}

	async fn run(&self, command: &str) -> ShellOutput {
		let output = Command::new(&self.su)
			.arg("-c")
			.arg(command)
			.stdin(Stdio::null())
			.kill_on_drop(true)
			.output()
			.await;

		match output {
			Ok(output) => {
				let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
				text.push_str(&String::from_utf8_lossy(&output.stderr));
				debug!(target = "privbridge.shell", status = %output.status, "su command finished");
				ShellOutput {
					success: output.status.success(),
					output: text,
				}
			}
			Err(err) => {
				debug!(target = "privbridge.shell", su = %self.su.display(), error = %err, "failed to spawn su");
				ShellOutput::failed(format!("failed to run {}: {}", self.su.display(), err))
			}
		}
	}
}
