use std::process::ExitCode;

fn main() -> ExitCode {
    markovrec_cli::run()
}
