use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::process::ExitCode;
use tracing::{debug, info};

use scim_filter::backend::SqlTranslator;
use scim_filter::config::AppConfig;
use scim_filter::error::{AppError, AppResult};
use scim_filter::filter::{Evaluator, Filter, FilterTranslator};
use scim_filter::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "scim-filter")]
#[command(about = "Evaluate and translate SCIM 2.0 filter expressions")]
struct Args {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (overrides config file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a filter and print it in normalised form
    Parse {
        filter: String,
    },
    /// Evaluate a filter against a JSON document
    Eval {
        filter: String,

        /// JSON document to evaluate (stdin when omitted). An array is
        /// filtered element by element.
        #[arg(short, long)]
        document: Option<String>,
    },
    /// Translate a filter into SQL conditions
    Translate {
        filter: String,

        /// Print a single SELECT statement instead of one condition per line
        #[arg(long)]
        select: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let body = e.to_response();
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| e.to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> AppResult<()> {
    let mut app_config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default_config(),
    };

    // Override with command line arguments if provided
    if let Some(level) = args.log_level {
        app_config.logging.level = level;
    }
    init_logging(&app_config.logging.level)?;

    match &args.config {
        Some(path) => info!(config = %path, "configuration loaded"),
        None => debug!("using default configuration"),
    }

    match args.command {
        Command::Parse { filter } => {
            let filter = Filter::from(&filter)?;
            println!("{}", filter);
        }
        Command::Eval { filter, document } => {
            let filter = Filter::from(&filter)?;
            let document = read_document(document.as_deref())?;
            let resolver = app_config.resolver();
            let evaluator = Evaluator::new(&resolver);

            match &document {
                Value::Array(resources) => {
                    let mut matched = Vec::new();
                    for resource in resources {
                        if evaluator.evaluate(&filter, resource)? {
                            matched.push(resource.clone());
                        }
                    }
                    info!(total = resources.len(), matched = matched.len(), "filtered resources");
                    println!("{}", serde_json::to_string_pretty(&matched)?);
                }
                resource => {
                    println!("{}", evaluator.evaluate(&filter, resource)?);
                }
            }
        }
        Command::Translate { filter, select } => {
            let filter = Filter::from(&filter)?;
            let translator = SqlTranslator::from_config(&app_config)?;
            let expressions = translator.translate(Some(&filter))?;

            if select {
                println!("{}", translator.select(&expressions));
            } else if expressions.is_empty() {
                println!("*");
            } else {
                for expression in &expressions {
                    println!("{}", expression);
                }
            }
        }
    }

    Ok(())
}

fn read_document(path: Option<&str>) -> AppResult<Value> {
    let content = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read document {}: {}", path, e),
            ))
        })?,
        None => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            content
        }
    };
    Ok(serde_json::from_str(&content)?)
}
