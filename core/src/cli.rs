use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::application::Application;
use crate::config::Config;
use crate::parser::{postfix_expression, postfix_to_string};
use crate::types::{Expression, ExpressionStatus};

#[derive(Parser)]
#[command(name = "abacus")]
#[command(about = "Abacus - distributed arithmetic expression evaluator", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate expressions with an in-process agent pool
    Eval {
        /// Expressions to evaluate
        #[arg(required = true)]
        expressions: Vec<String>,

        /// Number of agents (overrides workers.computing_power)
        #[arg(short = 'w', long = "workers")]
        workers: Option<usize>,

        /// Print the expression records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the postfix form of an expression
    Postfix {
        /// Infix expression
        expression: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load eagerly so config errors show up before any command output
    let mut config = Config::builder().config_path(cli.config).build()?;

    match cli.command {
        Commands::Eval {
            expressions,
            workers,
            json,
        } => {
            if let Some(workers) = workers {
                config.workers.computing_power = workers;
                config.validate()?;
            }

            let records = evaluate_all(config, expressions).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    print_record(record);
                }
            }

            let failed = records
                .iter()
                .filter(|r| r.status == ExpressionStatus::Error)
                .count();
            if failed > 0 {
                bail!("{} of {} expression(s) failed", failed, records.len());
            }
        }

        Commands::Postfix { expression } => {
            let postfix = postfix_expression(&expression)?;
            println!("{}", postfix_to_string(&postfix));
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Submit every expression, wait for all of them, then stop the agents
async fn evaluate_all(config: Config, expressions: Vec<String>) -> Result<Vec<Expression>> {
    let app = Application::new(config);
    let agents = app.spawn_agents();

    let ids: Vec<String> = expressions
        .into_iter()
        .map(|expression| app.calculation_service.submit(expression))
        .collect();

    let mut records = Vec::with_capacity(ids.len());
    for id in &ids {
        records.push(app.calculation_service.wait(id).await?);
    }

    app.shutdown(agents).await;
    Ok(records)
}

fn print_record(record: &Expression) {
    match record.status {
        ExpressionStatus::Success => println!(
            "{} = {}",
            record.expression,
            record.result.as_deref().unwrap_or_default()
        ),
        _ => println!(
            "{} : {} ({})",
            record.expression,
            record.status,
            record.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
