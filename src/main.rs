//! Binary entrypoint for the Sidekick command-line client.

use std::process::ExitCode;

use sidekick::start_sidekick;

fn main() -> ExitCode {
    start_sidekick::run()
}
