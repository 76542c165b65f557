use std::process::ExitCode;

fn main() -> ExitCode {
    retailsense_cli::run()
}
