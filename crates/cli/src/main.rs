use std::process::ExitCode;

fn main() -> ExitCode {
    vidsage_cli::run()
}
