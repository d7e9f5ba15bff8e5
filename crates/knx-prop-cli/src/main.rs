//! knx-prop - command-line tools for KNX property access.
//!
//! Reads and writes interface object properties of KNX devices, either by
//! local device management of a KNXnet/IP server or by remote property
//! services over the bus, and monitors raw bus traffic.

mod cli;
mod commands;
mod connector;
mod error;
mod logging;
mod shutdown;
mod sink;

use std::sync::Arc;

use clap::Parser;

use cli::{Cli, Commands};
use commands::Context;
use error::{exit_codes, CliError};
use sink::ConsoleSink;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            if e.needs_report() {
                eprintln!("Error: {}", e);
            }
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let options = cli.connection.options()?;
    // The interactive client always shows status output, the other tools with -v.
    let show_info = cli.verbose || matches!(cli.command, Commands::Client);
    let ctx = Context {
        sink: Arc::new(ConsoleSink::new(show_info)),
        connector: connector::select(cli.simulate.as_deref())?,
        shutdown: shutdown::on_interrupt(),
    };

    match cli.command {
        Commands::Property(args) => {
            let catalog = commands::load_catalog(cli.definitions.as_deref(), ctx.sink.as_ref());
            commands::run_property(args, &options, catalog, &ctx).await
        }
        Commands::Client => {
            let catalog = commands::load_catalog(cli.definitions.as_deref(), ctx.sink.as_ref());
            commands::run_client(&options, catalog, &ctx).await
        }
        Commands::Monitor(args) => commands::run_monitor(args, &options, &ctx).await,
    }
}
