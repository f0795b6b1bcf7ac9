//! Binary entry point for the `kiln` supervisor.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout();
    kiln::run(std::env::args_os(), &mut stdout)
}
