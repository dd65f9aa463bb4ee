use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use askpg::config::AppConfig;
use askpg::db::ConnectionConfig;
use askpg::export;
use askpg::llm::OpenAiClient;
use askpg::pipeline::{PgDatabase, Pipeline, PipelineResponse, SchemaSource};
use askpg::server::{self, AppState};

/// Ask your PostgreSQL database questions in natural language
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Use a saved connection profile by name
    #[arg(long = "connect")]
    connect: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP endpoint
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8000")]
        listen: String,
    },
    /// Ask one question and print the answer
    Ask {
        question: String,
        /// Print query results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the schema snapshot handed to the model
    Schema,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askpg=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    if matches!(cli.command, Command::Init) {
        let path = AppConfig::config_path();
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            AppConfig::default().save()?;
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    let mut db_config = match config.connection(cli.connect.as_deref()) {
        Some(c) => c,
        None => match cli.connect {
            Some(ref name) => {
                eprintln!("Error: no saved connection named {:?}", name);
                eprintln!("Saved connections:");
                for c in &config.connections {
                    eprintln!("  - {}", c.name);
                }
                std::process::exit(1);
            }
            None => ConnectionConfig::default(),
        },
    };

    // Resolve password: PGPASSWORD env var, then interactive prompt
    if db_config.password.is_empty() {
        if let Ok(pw) = std::env::var("PGPASSWORD") {
            db_config.password = pw;
        } else {
            let prompt = format!("Password for {}: ", db_config.display_string());
            db_config.password = rpassword::read_password_from_tty(Some(&prompt))?;
        }
    }

    match cli.command {
        Command::Serve { listen } => {
            let llm = Arc::new(OpenAiClient::with_base_url(
                AppConfig::api_key()?,
                config.llm.base_url.clone(),
            ));
            let pipeline = Pipeline::for_database(llm, config.llm, db_config);
            let state = AppState {
                pipeline: Arc::new(pipeline),
            };
            server::serve(state, &listen).await?;
        }
        Command::Ask { question, json } => {
            let llm = Arc::new(OpenAiClient::with_base_url(
                AppConfig::api_key()?,
                config.llm.base_url.clone(),
            ));
            let pipeline = Pipeline::for_database(llm, config.llm, db_config);
            match pipeline.process(&question).await? {
                PipelineResponse::General { text } => println!("{}", text),
                PipelineResponse::Query { sql, outcome } => {
                    eprintln!("-- {}", sql);
                    if json {
                        println!("{}", export::outcome_to_json(&outcome));
                    } else {
                        println!("{}", export::outcome_to_text(&outcome));
                    }
                }
            }
        }
        Command::Schema => {
            let database = PgDatabase::new(db_config);
            let snapshot = database.describe().await?;
            println!("{}", snapshot);
        }
        Command::Init => unreachable!("handled above"),
    }

    Ok(())
}
