use std::process::ExitCode;

use colored::Colorize;
use udm_schema::cli::CommandLineInterface;

fn main() -> ExitCode {
    let command_line_interface = CommandLineInterface::load();
    if let Err(error) = command_line_interface.init_tracing() {
        eprintln!("{} {error:#}", "warning:".yellow());
    }
    match command_line_interface.run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
