pub mod demo;
pub mod parse;
pub mod review;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "teller",
    about = "Reconstruct transaction tables from bank statement layouts."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a statement and print the reconstructed tables.
    Parse {
        /// Path to a statement: extracted-token JSON, or PDF with the pdf feature
        file: String,
        /// Override a detected column role: INDEX=ROLE (e.g. 2=deposit)
        #[arg(long = "map", value_name = "INDEX=ROLE")]
        map: Vec<String>,
        /// Directory to write withdrawals.csv, deposits.csv and statement.json
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Print tab-separated tables for pasting into a spreadsheet
        #[arg(long)]
        tsv: bool,
    },
    /// Parse a statement, then edit the reconstructed tables interactively.
    Review {
        /// Path to a statement: extracted-token JSON, or PDF with the pdf feature
        file: String,
    },
    /// Reconstruct a built-in sample statement to explore the output.
    Demo,
}
