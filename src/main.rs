use clap::{Parser as ClapParser, Subcommand};
use ecql::cli::{self, CheckOptions, CheckResult, CliError, SelectOptions};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "ecql")]
#[command(about = "ecql - compile and evaluate textual filters against JSON records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a filter and optionally evaluate it against one JSON record
    Check {
        /// The filter to compile
        filter: String,

        /// JSON record (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Print the input records that match a filter
    Select {
        /// The filter to compile
        filter: String,

        /// Input records: a JSON array or one JSON document per line
        /// (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Evaluate an expression against one JSON record
    Eval {
        /// The expression to compile
        expression: String,

        /// JSON record (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            filter,
            input,
            syntax_only,
        } => run_check(filter, input, syntax_only),
        Commands::Select {
            filter,
            input,
            pretty,
        } => run_select(filter, input, pretty),
        Commands::Eval {
            expression,
            input,
            pretty,
        } => run_eval(expression, input, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(s) => Ok(Some(s)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Io)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn run_check(filter: String, input: Option<String>, syntax_only: bool) -> Result<(), CliError> {
    let options = CheckOptions {
        filter,
        input: read_input(input)?,
        syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Matched(true) => println!("Matched"),
        CheckResult::Matched(false) => {
            println!("Not matched");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn run_select(filter: String, input: Option<String>, pretty: bool) -> Result<(), CliError> {
    let options = SelectOptions {
        filter,
        input: read_input(input)?.ok_or(CliError::NoInput)?,
    };

    for record in cli::execute_select(&options)? {
        let json = if pretty {
            serde_json::to_string_pretty(&record)
        } else {
            serde_json::to_string(&record)
        }
        .map_err(CliError::Json)?;
        println!("{}", json);
    }
    Ok(())
}

fn run_eval(expression: String, input: Option<String>, pretty: bool) -> Result<(), CliError> {
    let output = cli::execute_eval(&expression, read_input(input)?.as_deref())?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .map_err(CliError::Json)?;
    println!("{}", json);
    Ok(())
}
