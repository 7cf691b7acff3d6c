// src/main.rs
//! Mission List - terminal waypoint list editor

use clap::Parser;
use mission_list::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str()))
        .format_timestamp_millis()
        .init();

    if let Err(e) = cli::run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
