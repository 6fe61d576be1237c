use std::process::ExitCode;

use forkline::ui::output;

fn main() -> ExitCode {
    match forkline::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
