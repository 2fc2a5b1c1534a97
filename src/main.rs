use clap::Parser;
use econmon_service::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
