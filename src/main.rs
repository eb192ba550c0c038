//! cfn-resolve CLI
//!
//! Usage:
//!   cfn-resolve [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>          Resolver config (TOML format)
//!   -r, --region <REGION>        Override the AWS::Region pseudo-parameter
//!   -a, --account-id <ID>        Override the AWS::AccountId pseudo-parameter
//!   -p, --parameter <KEY=VALUE>  Override a template parameter (repeatable)
//!   -v, --verbose                Log resolution steps to stderr
//!   -h, --help                   Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cfn_resolve::{resolve_template, ResolverConfig, Template};

#[derive(Parser)]
#[command(name = "cfn-resolve")]
#[command(about = "Resolve CloudFormation intrinsic functions to concrete values")]
struct Cli {
    /// Template file in JSON format (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Resolver config file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Region used for AWS::Region and Fn::GetAZs
    #[arg(short, long)]
    region: Option<String>,

    /// Account id used for AWS::AccountId and generated ARNs
    #[arg(short, long)]
    account_id: Option<String>,

    /// Template parameter override, as KEY=VALUE
    #[arg(short, long = "parameter", value_parser = parse_parameter)]
    parameters: Vec<(String, String)>,

    /// Log resolution steps to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_parameter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "cfn_resolve=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load config
    let mut config = match &cli.config {
        Some(path) => match ResolverConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ResolverConfig::default(),
    };
    if let Some(region) = cli.region {
        config = config.with_region(region);
    }
    if let Some(account_id) = cli.account_id {
        config = config.with_account_id(account_id);
    }
    for (key, value) in cli.parameters {
        config = config.with_parameter(key, Value::String(value));
    }

    // Read input
    let source = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => buffer,
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let template = match Template::from_json(&source) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match resolve_template(&template, &config) {
        Ok(resolved) => match serde_json::to_string_pretty(&resolved) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error writing output: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
