// SPDX-License-Identifier: MIT

//! Shared command-line plumbing for the demo binaries.

use clap::error::{ContextKind, ErrorKind};
use clap::{CommandFactory, Parser};

/// Exit status for malformed command-line input.
pub const USAGE_ERROR: u8 = 2;

/// Parse arguments, rendering failures the way the demos promise.
///
/// Unknown options print `Unknown option: '--flag'` followed by the usage
/// text on stderr and exit with status 2, as do all other usage errors.
/// Help and version requests go to stdout and exit with status 0.
pub fn parse_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(arguments) => arguments,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                std::process::exit(0);
            }
            ErrorKind::UnknownArgument => {
                let flag = error
                    .get(ContextKind::InvalidArg)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                eprintln!("Unknown option: '{flag}'");
                eprintln!("{}", T::command().render_help());
                std::process::exit(USAGE_ERROR.into());
            }
            _other => {
                eprintln!("{error}");
                std::process::exit(USAGE_ERROR.into());
            }
        },
    }
}
