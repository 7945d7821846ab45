use std::process::ExitCode;

fn main() -> ExitCode {
    cartage_cli::run()
}
