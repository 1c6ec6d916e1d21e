//! nonsnapshot - fixed release versions for changed modules

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = nonsnapshot::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
