//! Static commands: validate, reformat or dump a program without running it

use super::CliError;
use crate::{
    Formatter, TreeDumper,
    dump::dump_program,
    formatter::{FormatOptions, format_program_with},
    parse, parse_payload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckMode {
    /// Only validate syntax
    #[default]
    Syntax,
    /// Print the program in canonical layout
    Format(FormatOptions),
    /// Print the tree
    Dump,
}

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Program text
    pub source: String,
    pub mode: CheckMode,
    /// Treat the input as a bare sequence of dicts (a bulk payload file)
    pub payload_only: bool,
}

/// Result of a check operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    SyntaxValid,
    Formatted(String),
    Dump(String),
}

pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    if options.payload_only {
        let dicts = parse_payload(&options.source)?;
        return Ok(match options.mode {
            CheckMode::Syntax => CheckResult::SyntaxValid,
            CheckMode::Format(format) => CheckResult::Formatted(
                dicts
                    .iter()
                    .map(|dict| dict.accept(&mut Formatter::with_options(format)))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            CheckMode::Dump => CheckResult::Dump(
                dicts
                    .iter()
                    .map(|dict| dict.accept(&mut TreeDumper::new()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        });
    }

    let statements = parse(&options.source)?;
    Ok(match options.mode {
        CheckMode::Syntax => CheckResult::SyntaxValid,
        CheckMode::Format(format) => {
            CheckResult::Formatted(format_program_with(&statements, format))
        }
        CheckMode::Dump => CheckResult::Dump(dump_program(&statements)),
    })
}
