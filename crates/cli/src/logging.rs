//! Tracing subscriber setup.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

fn env_filter(verbose: u8) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(match verbose {
			0 => "warn",
			1 => "privbridge=info,warn",
			_ => "privbridge=debug,info",
		})
	})
}

/// Installs stderr logging, plus an append-only file layer when `log_path` is set.
///
/// A log file that cannot be opened is reported on stderr and skipped.
pub fn init_logging(verbose: u8, log_path: Option<&Path>) {
	let stderr_layer = tracing_subscriber::fmt::layer()
		.with_writer(std::io::stderr)
		.with_target(verbose > 1)
		.compact()
		.with_filter(env_filter(verbose));

	let file_layer = log_path.and_then(|path| match OpenOptions::new().create(true).append(true).open(path) {
		Ok(file) => Some(
			tracing_subscriber::fmt::layer()
				.with_writer(Mutex::new(file))
				.with_target(true)
				.with_ansi(false)
				.with_filter(EnvFilter::new("privbridge=debug,info")),
		),
		Err(err) => {
			eprintln!("warning: cannot open log file {}: {err}", path.display());
			None
		}
	});

	let _ = tracing_subscriber::registry().with(stderr_layer).with(file_layer).try_init();
}
