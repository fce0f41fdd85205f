mod cli;
mod dispatcher;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use papertrade::config::Settings;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

fn init_tracing(default_level: &str) {
    // RUST_LOG wins over the configured level; logs go to stderr so stdout
    // stays parseable for --json
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(&settings.log_level);

    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let ctx = dispatcher::Context {
        user_id: cli.user.unwrap_or(settings.user_id),
        json_output: cli.json,
        settings,
    };
    dispatcher::dispatch_command(cli.command, &ctx)
}
