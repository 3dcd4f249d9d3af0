use privbridge::Call;
use serde_json::Value;
use tracing::debug;

use crate::context::CommandContext;
use crate::error::{CliError, Result};

pub async fn execute(command: &str, ctx: &CommandContext) -> Result<Value> {
	let manager = ctx.manager()?;
	let result = manager.execute(&Call::shell(command)).await;

	if !manager.config().await.allow_background_helper {
		debug!(target = "privbridge.cli", "background helper disallowed; closing it");
		manager.close_helper_and_stop().await;
	}

	let reply = result?.into_result().map_err(CliError::Remote)?;
	Ok(Value::String(reply.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()).unwrap_or_default()))
}
