use privbridge::config::DEFAULT_DEBUG_BRIDGE_PORT;
use serde_json::{Value, json};
use tracing::info;

use crate::cli::ConfigSetArgs;
use crate::context::CommandContext;
use crate::error::{CliError, Result};

pub fn show(ctx: &CommandContext) -> Result<Value> {
	Ok(json!({
		"preferences": ctx.preferences(),
		"execPath": ctx.store().exec_path(),
	}))
}

pub fn set(args: ConfigSetArgs, ctx: &CommandContext) -> Result<Value> {
	let mut prefs = ctx.preferences();

	if let Some(root) = args.root {
		prefs.use_root = root;
	}
	if let Some(addr) = args.debug_bridge.as_deref() {
		let (host, port) = parse_host_port(addr)?;
		prefs.use_debug_bridge = true;
		prefs.debug_bridge_host = host;
		prefs.debug_bridge_port = port;
	}
	if args.no_debug_bridge {
		prefs.use_debug_bridge = false;
	}
	if let Some(as_root) = args.root_over_debug_bridge {
		prefs.root_over_debug_bridge = as_root;
	}
	if let Some(background) = args.background {
		prefs.allow_background_helper = background;
	}
	if let Some(path) = args.log_path {
		prefs.log_path = Some(path);
	}
	if args.no_log_path {
		prefs.log_path = None;
	}
	if let Some(user_id) = args.user_id {
		prefs.user_id = user_id;
	}

	ctx.store().set_preferences(prefs)?;
	if let Some(path) = args.exec_path {
		ctx.store().set_exec_path(Some(path))?;
	}
	info!(target = "privbridge.cli", "preferences updated");
	show(ctx)
}

fn parse_host_port(addr: &str) -> Result<(String, u16)> {
	let (host, port) = match addr.rsplit_once(':') {
		Some((host, port)) => {
			let port = port.parse::<u16>().ok().filter(|port| *port != 0).ok_or_else(|| CliError::InvalidInput(format!("invalid debug bridge port in {addr:?}")))?;
			(host, port)
		}
		None => (addr, DEFAULT_DEBUG_BRIDGE_PORT),
	};
	if host.is_empty() {
		return Err(CliError::InvalidInput(format!("missing debug bridge host in {addr:?}")));
	}
	Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn host_port_parsing() {
		assert_eq!(parse_host_port("10.0.0.5:5037").unwrap(), ("10.0.0.5".to_string(), 5037));
		assert_eq!(parse_host_port("localhost").unwrap(), ("localhost".to_string(), DEFAULT_DEBUG_BRIDGE_PORT));
		assert!(parse_host_port("host:notaport").is_err());
		assert!(parse_host_port(":5555").is_err());
		assert!(parse_host_port("host:0").is_err());
	}
}
