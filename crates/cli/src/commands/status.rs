use privbridge::{BridgeConfig, Error, HelperEndpoint};
use privbridge_runtime::process::port_available;
use serde_json::{Value, json};

use crate::context::CommandContext;
use crate::error::{CliError, Result};

pub fn execute(ctx: &CommandContext) -> Result<Value> {
	let prefs = ctx.preferences();
	let endpoint = HelperEndpoint::for_user(prefs.user_id);
	let listening = !port_available(endpoint.host, endpoint.port);
	let token_present = ctx.store().current_token().is_some();

	let config = match ctx.bridge_config() {
		Ok(config) => summarize(&config),
		Err(CliError::Bridge(Error::Config(reason))) => json!({ "configured": false, "reason": reason }),
		Err(err) => return Err(err),
	};

	Ok(json!({
		"statePath": ctx.state_path(),
		"helperPort": endpoint.port,
		"helperListening": listening,
		"tokenPresent": token_present,
		"config": config,
	}))
}

fn summarize(config: &BridgeConfig) -> Value {
	json!({
		"configured": true,
		"strategies": config.strategies,
		"execPaths": config.exec_paths,
		"allowBackgroundHelper": config.allow_background_helper,
		"logPath": config.log_path,
	})
}
