mod classify;
mod cli;
mod columns;
mod error;
mod export;
mod fmt;
mod models;
mod normalizer;
#[cfg(feature = "pdf")]
mod pdf;
mod reconstruct;
mod render;
mod rows;
mod table;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            file,
            map,
            output_dir,
            tsv,
        } => cli::parse::run(&file, &map, output_dir, tsv),
        Commands::Review { file } => cli::review::run(&file),
        Commands::Demo => cli::demo::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
