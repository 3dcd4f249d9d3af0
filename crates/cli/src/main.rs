use clap::Parser;
use privbridge_cli::cli::Cli;
use privbridge_cli::context::CommandContext;
use privbridge_cli::output::print_result;
use privbridge_cli::{commands, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let ctx = match CommandContext::open(cli.state_dir.as_deref()) {
		Ok(ctx) => ctx,
		Err(err) => {
			logging::init_logging(cli.verbose, None);
			return Err(err);
		}
	};
	logging::init_logging(cli.verbose, ctx.preferences().log_path.as_deref());

	let result = commands::dispatch(cli.command, &ctx).await;
	print_result(&result, cli.format);
	if !result.ok {
		std::process::exit(1);
	}
	Ok(())
}
