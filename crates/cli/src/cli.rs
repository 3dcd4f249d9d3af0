use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "privbridge")]
#[command(about = "Run commands through an elevated helper over an authenticated loopback bridge")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	/// Directory holding the bridge state file (defaults to the user config dir)
	#[arg(long, global = true, value_name = "DIR", env = "PRIVBRIDGE_STATE_DIR")]
	pub state_dir: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a shell command through the helper
	Exec {
		/// Command line, passed to the helper's shell as one string
		#[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
		command: Vec<String>,
	},

	/// Connect to the helper, launching it if needed
	Start,

	/// Drop this process's session without stopping the helper
	Stop,

	/// Stop, then start again
	Restart,

	/// Ask the helper to exit
	Close,

	/// Show configuration and helper reachability
	Status,

	/// Manage the shared helper token
	Token {
		#[command(subcommand)]
		action: TokenAction,
	},

	/// Show or change persisted preferences
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Exec { .. } => "exec",
			Commands::Start => "start",
			Commands::Stop => "stop",
			Commands::Restart => "restart",
			Commands::Close => "close",
			Commands::Status => "status",
			Commands::Token { action } => match action {
				TokenAction::Show => "token.show",
				TokenAction::Clear => "token.clear",
				TokenAction::Regenerate => "token.regenerate",
			},
			Commands::Config { action } => match action {
				ConfigAction::Show => "config.show",
				ConfigAction::Set(_) => "config.set",
			},
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum TokenAction {
	/// Print the token, generating it on first use
	Show,
	/// Forget the token; a new one is generated when next needed
	Clear,
	/// Replace the token with a freshly generated one
	Regenerate,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
	/// Print persisted preferences
	Show,
	/// Change persisted preferences
	Set(ConfigSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct ConfigSetArgs {
	/// Launch the helper through `su`
	#[arg(long, value_name = "BOOL")]
	pub root: Option<bool>,

	/// Launch the helper through the debug bridge at HOST[:PORT]
	#[arg(long, value_name = "HOST[:PORT]", conflicts_with = "no_debug_bridge")]
	pub debug_bridge: Option<String>,

	/// Stop using the debug bridge
	#[arg(long)]
	pub no_debug_bridge: bool,

	/// Wrap the debug-bridge launch command in `su -c`
	#[arg(long, value_name = "BOOL")]
	pub root_over_debug_bridge: Option<bool>,

	/// Let the helper keep running after each command
	#[arg(long, value_name = "BOOL")]
	pub background: Option<bool>,

	/// Append diagnostic logs (and full helper output) to FILE
	#[arg(long, value_name = "FILE", conflicts_with = "no_log_path")]
	pub log_path: Option<PathBuf>,

	/// Stop writing the diagnostic log
	#[arg(long)]
	pub no_log_path: bool,

	/// Provisioned helper launch script
	#[arg(long, value_name = "PATH")]
	pub exec_path: Option<PathBuf>,

	/// User id; offsets the helper port
	#[arg(long, value_name = "ID")]
	pub user_id: Option<u16>,
}
