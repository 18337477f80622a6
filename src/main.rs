use clap::Parser;
use taskboard::cli::commands::Cli;
use taskboard::cli::handlers::{self, Context};

fn main() {
    let cli = Cli::parse();

    let ctx = match Context::new(cli.data_dir.as_deref(), cli.json) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    taskboard::log::setup(cli.verbose, &ctx.config.log.level);
    tracing::debug!(data_dir = %ctx.data_dir.display(), "starting");

    if let Err(e) = handlers::dispatch(cli.command, &ctx) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
