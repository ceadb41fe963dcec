//! gemledger binary entry point.
//!
//! Errors are printed to stderr as `{"code": …, "message": …}` with exit
//! status 1.

use clap::Parser;

use gemledger_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    gemledger_cli::init_tracing();

    if let Err(err) = gemledger_cli::run(cli).await {
        match serde_json::to_string(&err) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", err),
        }
        std::process::exit(1);
    }
}
