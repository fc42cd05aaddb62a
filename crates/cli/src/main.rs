use std::process::ExitCode;

fn main() -> ExitCode {
    bidwise_cli::run()
}
