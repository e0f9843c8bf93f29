mod app;
mod race;

use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    match app::build_app() {
        Ok(wiring) => app::run(wiring),
        Err(err) => {
            error!(error = %err, "race_setup_failed");
            ExitCode::FAILURE
        }
    }
}
