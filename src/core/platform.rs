//! Process-level entry helpers

/// Report a failed run and exit with code 1.
pub fn handle_error(error: anyhow::Error) {
    eprintln!();
    eprintln!("glyphpack failed:");
    // print the whole context chain, outermost first
    eprintln!("{error:#}");
    eprintln!();
    eprintln!("No output was written for the failed configuration.");
    eprintln!("Try running with --help for usage information.");
    std::process::exit(1);
}

/// Parse command line arguments.
pub fn get_cli_args() -> crate::core::cli::CliArgs {
    use clap::Parser;
    crate::core::cli::CliArgs::parse()
}
