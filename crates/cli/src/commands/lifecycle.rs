//! Helper lifecycle commands.
//!
//! Each CLI invocation owns a fresh manager, so `stop` only drops this
//! process's session. `close` is what actually ends the helper.

use privbridge::BridgeManager;
use serde_json::{Value, json};

use crate::context::CommandContext;
use crate::error::Result;

fn state(manager: &BridgeManager, port: u16) -> Value {
	json!({
		"state": manager.state(),
		"running": manager.is_running(),
		"helperPort": port,
	})
}

pub async fn start(ctx: &CommandContext) -> Result<Value> {
	let manager = ctx.manager()?;
	manager.start().await?;
	Ok(state(&manager, manager.config().await.helper.port))
}

pub async fn stop(ctx: &CommandContext) -> Result<Value> {
	let manager = ctx.manager()?;
	manager.stop().await;
	Ok(state(&manager, manager.config().await.helper.port))
}

pub async fn restart(ctx: &CommandContext) -> Result<Value> {
	let manager = ctx.manager()?;
	manager.restart().await?;
	Ok(state(&manager, manager.config().await.helper.port))
}

pub async fn close(ctx: &CommandContext) -> Result<Value> {
	let manager = ctx.manager()?;
	manager.close_helper_and_stop().await;
	Ok(state(&manager, manager.config().await.helper.port))
}
