use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use odata_planner::connector::Planner;
use odata_planner::query::QueryRequest;
use odata_planner_configuration::environment::ProcessEnvironment;
use odata_planner_configuration::{write_parsed_configuration, ParsedConfiguration};

/// Plan and run OData queries against 1C from natural-language requests.
#[derive(Parser)]
#[command(name = "odata-planner", version)]
struct Cli {
    /// The configuration directory.
    #[arg(long, env = "ODATA_PLANNER_CONFIGURATION", default_value = ".")]
    configuration: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write an initial configuration and its JSON schema into a directory.
    Initialize {
        /// The directory to write into.
        dir: PathBuf,
    },
    /// List the candidate entities for a request.
    Candidates { text: String },
    /// List the entity sets of the OData service.
    Entities {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Plan and run a request, printing the result as JSON.
    Query {
        text: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Print a plain-text summary instead of JSON.
        #[arg(long)]
        summary: bool,
    },
}

#[tokio::main]
pub async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Initialize { dir } = &cli.command {
        write_parsed_configuration(ParsedConfiguration::initial(), dir).await?;
        return Ok(());
    }

    let mut metrics_registry = prometheus::Registry::new();
    let planner = Planner::setup(&cli.configuration, ProcessEnvironment, &mut metrics_registry).await?;

    match cli.command {
        Command::Initialize { .. } => {}
        Command::Candidates { text } => {
            let candidates = planner.candidates(&text).await;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        Command::Entities { username, password } => {
            let entities = planner
                .entities(username.as_deref(), password.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&entities)?);
        }
        Command::Query {
            text,
            username,
            password,
            summary,
        } => {
            let response = planner
                .query(QueryRequest {
                    user_query: text.clone(),
                    username,
                    password,
                })
                .await?;
            if summary {
                println!("{}", response.summary.describe(&text, &response.plan.entity));
            } else {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
    }
    Ok(())
}
