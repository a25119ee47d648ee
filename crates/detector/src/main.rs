use clap::Parser;
use detector::cli::{self, Cli};
use detector::error::DetectorError;
use detector::runtime::boot;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let Some(target) = cli.target() else {
        println!("{}", cli::usage());
        return;
    };

    boot::init_logging();
    let code = match boot::run(target).await {
        Ok(code) => code,
        Err(e @ DetectorError::Spawn { .. }) => {
            eprintln!("{}", e);
            eprintln!("Check the command and try again.");
            1
        }
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    std::process::exit(code);
}
