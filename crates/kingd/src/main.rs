//! The king daemon binary.

use std::io::Write;
use std::process::ExitCode;

use kingd::KingExit;

fn main() -> ExitCode {
    match kingd::run_daemon() {
        Ok(KingExit::Drained) => ExitCode::SUCCESS,
        Ok(KingExit::Aborted) => std::process::abort(),
        Err(error) => {
            tracing::error!(target: "kingd", %error, "daemon exiting");
            let mut stderr = std::io::stderr().lock();
            if let Err(write_error) = writeln!(stderr, "kingd: {error}") {
                tracing::debug!(target: "kingd", %write_error, "stderr unavailable");
            }
            ExitCode::FAILURE
        }
    }
}
