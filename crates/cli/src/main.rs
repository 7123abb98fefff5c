use std::process::ExitCode;

fn main() -> ExitCode {
    caseworth_cli::run()
}
