use std::io::{self, Write};
use std::time::Instant;

use serde::Serialize;

use crate::output::format::OutputFormat;
use crate::output::model::{CommandError, CommandResult, ErrorCode, SCHEMA_VERSION};

/// Builder for constructing command results.
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
			details: None,
		});
		self
	}

	pub fn command_error(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();
		CommandResult {
			schema_version: SCHEMA_VERSION,
			ok,
			command: self.command,
			data: self.data,
			error: self.error,
			duration_ms: Some(self.start_time.elapsed().as_millis() as u64),
		}
	}
}

/// Print a command result to stdout in the specified format.
pub fn print_result(result: &CommandResult<serde_json::Value>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text(result: &CommandResult<serde_json::Value>) {
	if let Some(ref error) = result.error {
		eprintln!("Error [{}]: {}", error.code, error.message);
		if let Some(stack) = error.details.as_ref().and_then(|details| details.get("stack")).and_then(|stack| stack.as_str()) {
			eprintln!("{stack}");
		}
		return;
	}

	let mut stdout = io::stdout().lock();
	match &result.data {
		// Shell replies are printed verbatim.
		Some(serde_json::Value::String(text)) => {
			let _ = stdout.write_all(text.as_bytes());
		}
		Some(serde_json::Value::Null) | None => {}
		Some(data) => {
			if let Ok(json) = serde_json::to_string_pretty(data) {
				let _ = writeln!(stdout, "{json}");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn ok_requires_data_and_no_error() {
		let result = ResultBuilder::new("status").data(json!({ "configured": true })).build();
		assert!(result.ok);

		let result = ResultBuilder::<serde_json::Value>::new("exec").error(ErrorCode::BootstrapFailed, "root access denied").build();
		assert!(!result.ok);
		assert!(result.data.is_none());
	}

	#[test]
	fn envelope_serializes_camel_case_and_skips_empty_fields() {
		let result = ResultBuilder::<serde_json::Value>::new("exec").error(ErrorCode::HandshakeFailed, "helper rejected the token").build();
		let value = serde_json::to_value(&result).unwrap();
		assert_eq!(value["schemaVersion"], SCHEMA_VERSION);
		assert_eq!(value["error"]["code"], "HANDSHAKE_FAILED");
		assert!(value.get("data").is_none());
	}
}
