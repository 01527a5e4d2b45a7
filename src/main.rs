use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;

use infra_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    match &args.command {
        cli::Command::Version => {
            commands::version::run(&mut std::io::stdout())?;
            Ok(())
        }
        cli::Command::Refactor(opts) => {
            let command = args.command.name();
            logging::init_subscriber(args.verbose, command);
            let log = Arc::new(logging::Logger::new(command));

            let interrupted = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&interrupted);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
                log.warn(&format!("cannot install Ctrl-C handler: {e}"));
            }

            commands::refactor::run(
                &args.global,
                opts,
                &log,
                interrupted,
                &mut std::io::stderr(),
            )
        }
    }
}
