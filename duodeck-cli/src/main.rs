//! # Duodeck
//!
//! A terminal two-deck DJ player with a persistent track library.

use log::error;

mod app;
mod cli;
mod controls;
mod logging;
mod runner;
mod ui;

fn main() {
    dotenv::dotenv().ok();
    let args = cli::args::build_cli().get_matches();

    // The TUI owns the terminal, so only echo logs when it is not drawn.
    let tui = args.subcommand().is_none() && !args.get_flag("quiet");
    let log_buffer = logging::init(!tui);

    let code = match runner::run(&args, log_buffer) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            if tui {
                eprintln!("{}", err);
            }
            -1
        }
    };

    std::process::exit(code)
}
