use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn run(state_dir: &Path, args: &[&str]) -> (bool, Value) {
	let output = Command::new(env!("CARGO_BIN_EXE_privbridge"))
		.arg("--state-dir")
		.arg(state_dir)
		.args(["--format", "json"])
		.args(args)
		.env_remove("RUST_LOG")
		.output()
		.expect("failed to execute privbridge");

	let stdout = String::from_utf8_lossy(&output.stdout);
	let parsed = serde_json::from_str(&stdout).unwrap_or_else(|_| panic!("stdout is not JSON: {stdout}"));
	(output.status.success(), parsed)
}

#[test]
fn token_show_is_stable_until_cleared() {
	let dir = TempDir::new().unwrap();

	let (ok, first) = run(dir.path(), &["token", "show"]);
	assert!(ok);
	let token = first["data"]["token"].as_str().unwrap().to_string();
	assert!((3..=5).contains(&token.split('-').count()));

	let (_, again) = run(dir.path(), &["token", "show"]);
	assert_eq!(again["data"]["token"], token.as_str());

	let (ok, cleared) = run(dir.path(), &["token", "clear"]);
	assert!(ok);
	assert_eq!(cleared["command"], "token.clear");

	let (_, status) = run(dir.path(), &["status"]);
	assert_eq!(status["data"]["tokenPresent"], false);
}

#[test]
fn config_set_persists_preferences() {
	let dir = TempDir::new().unwrap();

	let (ok, set) = run(
		dir.path(),
		&["config", "set", "--root", "true", "--debug-bridge", "192.168.1.20:5037", "--exec-path", "/data/local/tmp/run_server.sh"],
	);
	assert!(ok, "{set}");

	let (ok, shown) = run(dir.path(), &["config", "show"]);
	assert!(ok);
	let prefs = &shown["data"]["preferences"];
	assert_eq!(prefs["useRoot"], true);
	assert_eq!(prefs["useDebugBridge"], true);
	assert_eq!(prefs["debugBridgeHost"], "192.168.1.20");
	assert_eq!(prefs["debugBridgePort"], 5037);
	assert_eq!(shown["data"]["execPath"], "/data/local/tmp/run_server.sh");

	let (ok, status) = run(dir.path(), &["status"]);
	assert!(ok);
	let strategies = status["data"]["config"]["strategies"].as_array().unwrap();
	assert_eq!(strategies[0]["mode"], "debug_bridge");
	assert_eq!(strategies[1]["mode"], "root");
}

#[test]
fn invalid_debug_bridge_address_is_rejected() {
	let dir = TempDir::new().unwrap();
	let (ok, result) = run(dir.path(), &["config", "set", "--debug-bridge", "host:notaport"]);
	assert!(!ok);
	assert_eq!(result["error"]["code"], "INVALID_INPUT");
}

#[test]
fn exec_without_a_bootstrap_mode_is_a_config_error() {
	let dir = TempDir::new().unwrap();

	let (ok, status) = run(dir.path(), &["status"]);
	assert!(ok);
	assert_eq!(status["data"]["config"]["configured"], false);

	let (ok, result) = run(dir.path(), &["exec", "id"]);
	assert!(!ok);
	assert_eq!(result["ok"], false);
	assert_eq!(result["error"]["code"], "CONFIG_ERROR");
}
