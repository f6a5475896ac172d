//! rq CLI
//!
//! 파라미터 객체(JSON)를 SQL 조각으로 컴파일하거나, 설정된 DB에서 실행합니다.
//! 커넥션 풀은 여기서 만들어 컬렉션에 넘깁니다.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rq_sql::QueryFactory;
use rq_store::{Collection, CollectionOptions, Pool, SqliteDriver};

mod commands;
mod config;

use commands::{OperationKind, OutputFormat};
use config::Config;

#[derive(Parser)]
#[command(name = "rq")]
#[command(author, version, about = "Compile and run generic queries against a relational backend", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a parameter object into SQL fragments
    Compile {
        kind: OperationKind,

        /// JSON parameters, or @path to a JSON file
        #[arg(default_value = "{}")]
        params: String,
    },

    /// Execute an operation against the configured database
    Run {
        /// Target table
        #[arg(long)]
        table: String,

        /// Primary key that receives synthesized insert ids
        #[arg(long, default_value = "id")]
        primary_key: String,

        /// JSON policy file
        #[arg(long)]
        policy: Option<PathBuf>,

        #[command(subcommand)]
        action: RunAction,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommand enums
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum RunAction {
    Find {
        #[arg(default_value = "{}")]
        params: String,
        /// Pre-validated SQL, executed verbatim
        #[arg(long, conflicts_with = "params")]
        raw: Option<String>,
    },
    Count {
        #[arg(default_value = "{}")]
        params: String,
        #[arg(long, conflicts_with = "params")]
        raw: Option<String>,
    },
    Remove {
        #[arg(default_value = "{}")]
        params: String,
        #[arg(long, conflicts_with = "params")]
        raw: Option<String>,
    },
    /// Delete every row of the table
    RemoveAll,
    Update {
        #[arg(default_value = "{}")]
        params: String,
        #[arg(long, conflicts_with = "params")]
        raw: Option<String>,
    },
    /// Insert a JSON array of records
    Insert { records: String },
    Aggregate {
        #[arg(default_value = "{}")]
        params: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // 로그는 stderr로 (stdout은 결과 출력)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rq_cli=info,rq_store=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { kind, params } => commands::compile::compile(kind, &params, cli.format),

        Commands::Run {
            table,
            primary_key,
            policy,
            action,
        } => {
            let config = Config::from_env()?;
            tracing::debug!("Loaded config: {:?}", config);

            let options = CollectionOptions {
                primary_key,
                policy: config::load_policy(policy.as_deref())?,
            };
            let factory = QueryFactory::with_policy(options.policy);

            let pool: Arc<dyn Pool> =
                Arc::new(SqliteDriver::connect(&config.database_url, config.max_connections).await?);
            let collection = Collection::with_options(table, pool, options);

            let run = commands::run::Runner::new(&collection, factory, cli.format);
            match action {
                RunAction::Find { params, raw } => run.find(&params, raw).await,
                RunAction::Count { params, raw } => run.count(&params, raw).await,
                RunAction::Remove { params, raw } => run.remove(&params, raw).await,
                RunAction::RemoveAll => run.remove_all().await,
                RunAction::Update { params, raw } => run.update(&params, raw).await,
                RunAction::Insert { records } => run.insert(&records).await,
                RunAction::Aggregate { params } => run.aggregate(&params).await,
            }
        }
    }
}
