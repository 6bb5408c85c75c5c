use anyhow::Result;
use clap::Parser;
use query_harness::numbering::number_file;
use std::path::PathBuf;

/// Prefixes the statements of a source file with sequential numbers.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Source file; the numbered copy is written next to it
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = number_file(&cli.input)?;
    println!("{}", output.display());
    Ok(())
}
