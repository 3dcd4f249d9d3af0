mod config;
mod exec;
mod lifecycle;
mod status;
mod token;

use serde_json::Value;

use crate::cli::{Commands, ConfigAction, TokenAction};
use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{CommandError, CommandResult, ResultBuilder};

/// Runs `command` and wraps its outcome in the result envelope.
pub async fn dispatch(command: Commands, ctx: &CommandContext) -> CommandResult<Value> {
	let builder = ResultBuilder::new(command.name());
	match run(command, ctx).await {
		Ok(data) => builder.data(data).build(),
		Err(err) => {
			tracing::debug!(target = "privbridge.cli", error = %err, "command failed");
			builder.command_error(CommandError::from(&err)).build()
		}
	}
}

async fn run(command: Commands, ctx: &CommandContext) -> Result<Value> {
	match command {
		Commands::Exec { command } => exec::execute(&command.join(" "), ctx).await,
		Commands::Start => lifecycle::start(ctx).await,
		Commands::Stop => lifecycle::stop(ctx).await,
		Commands::Restart => lifecycle::restart(ctx).await,
		Commands::Close => lifecycle::close(ctx).await,
		Commands::Status => status::execute(ctx),
		Commands::Token { action } => match action {
			TokenAction::Show => token::show(ctx),
			TokenAction::Clear => token::clear(ctx),
			TokenAction::Regenerate => token::regenerate(ctx),
		},
		Commands::Config { action } => match action {
			ConfigAction::Show => config::show(ctx),
			ConfigAction::Set(args) => config::set(args, ctx),
		},
	}
}
