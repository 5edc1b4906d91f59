use std::process::ExitCode;

use app::bootstrap::{self, CliOutcome};

mod app;

fn main() -> ExitCode {
    let options = match bootstrap::parse_cli() {
        Ok(CliOutcome::Run(options)) => options,
        Ok(CliOutcome::Help) => {
            println!("{}", bootstrap::usage_text());
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    match bootstrap::build_app(options) {
        Ok(app) => app::loop_runner::run(app),
        Err(message) => {
            tracing::error!(error = %message, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
