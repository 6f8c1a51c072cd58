use clap::{Parser as ClapParser, Subcommand};
use esq_lang::cli::{self, CheckMode, CheckOptions, CheckResult, CliError, RunOptions};
use esq_lang::formatter::FormatOptions;
use esq_lang::logging::init_tracing;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "esq")]
#[command(about = "esq - a console language for document database requests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Input {
    /// Program text (reads --file or stdin if not provided)
    program: Option<String>,

    /// Read the program from a file
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate program syntax
    Check {
        #[command(flatten)]
        input: Input,

        /// Input is a bare sequence of dicts (bulk payload)
        #[arg(long)]
        payload_only: bool,
    },

    /// Print the program in canonical layout
    Fmt {
        #[command(flatten)]
        input: Input,

        /// Spaces around operators and one dict member per line
        #[arg(short, long)]
        pretty: bool,

        /// Spaces per nesting level with --pretty
        #[arg(long, default_value_t = 2)]
        indent: usize,

        /// Input is a bare sequence of dicts (bulk payload)
        #[arg(long)]
        payload_only: bool,
    },

    /// Print the syntax tree
    Dump {
        #[command(flatten)]
        input: Input,
    },

    /// Execute the program, printing requests instead of sending them
    Run {
        #[command(flatten)]
        input: Input,

        /// Pretty-print the results
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            input,
            payload_only,
        } => run_check(input, CheckMode::Syntax, payload_only),
        Commands::Fmt {
            input,
            pretty,
            indent,
            payload_only,
        } => run_check(
            input,
            CheckMode::Format(FormatOptions { pretty, indent }),
            payload_only,
        ),
        Commands::Dump { input } => run_check(input, CheckMode::Dump, false),
        Commands::Run { input, pretty } => run_program(input, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_source(input: Input) -> Result<String, CliError> {
    match (input.program, input.file) {
        (Some(program), _) => Ok(program),
        (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
        (None, None) if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        (None, None) => Err(CliError::NoInput),
    }
}

fn run_check(input: Input, mode: CheckMode, payload_only: bool) -> Result<(), CliError> {
    let options = CheckOptions {
        source: read_source(input)?,
        mode,
        payload_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Formatted(text) | CheckResult::Dump(text) => println!("{}", text),
    }
    Ok(())
}

fn run_program(input: Input, pretty: bool) -> Result<(), CliError> {
    let options = RunOptions {
        source: read_source(input)?,
        pretty,
    };

    let report = cli::execute_run(&options)?;
    for output in &report.outputs {
        println!("{}", output);
    }
    for error in &report.errors {
        eprintln!("error: {}", error);
    }
    if !report.errors.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}
