// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use httpsdemo::{checksum, cli};

/// Prints the checksum (MD5 by default) of a file to STDOUT.
#[derive(Debug, Parser)]
#[command(name = "checksum", version)]
struct Cli {
    /// The file whose checksum to calculate.
    file: PathBuf,

    /// MD5, SHA-1, SHA-256, ...
    #[arg(short = 'a', long = "algorithm", default_value = checksum::DEFAULT_ALGORITHM)]
    algorithm: String,
}

fn main() -> ExitCode {
    let opts = cli::parse_or_exit::<Cli>();
    match checksum::digest_file(&opts.file, &opts.algorithm) {
        Ok(digest) => {
            println!("{digest}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{error}");
            ExitCode::from(cli::USAGE_ERROR)
        }
    }
}
