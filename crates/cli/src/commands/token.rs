use privbridge::Token;
use serde_json::{Value, json};

use crate::context::CommandContext;
use crate::error::Result;

pub fn show(ctx: &CommandContext) -> Result<Value> {
	let token = ctx.store().token()?;
	Ok(json!({ "token": token.expose() }))
}

pub fn clear(ctx: &CommandContext) -> Result<Value> {
	ctx.store().clear_token()?;
	Ok(json!({ "cleared": true }))
}

/// A helper still running with the old token rejects the new one until restarted.
pub fn regenerate(ctx: &CommandContext) -> Result<Value> {
	let token = Token::generate();
	ctx.store().set_token(token.clone())?;
	Ok(json!({ "token": token.expose() }))
}
