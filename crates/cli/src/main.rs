use std::process::ExitCode;

fn main() -> ExitCode {
    breezy_cli::run()
}
