//! AreaDB command-line tool
//!
//! Runs the filter engine and the record store against an in-memory store,
//! for trying out queries and checking configuration.
//!
//! # Examples
//!
//! ```bash
//! # Evaluate one filter against one record
//! areadb eval --filter '{"gt": {"age": 40}}' --record '{"age": 44}'
//!
//! # Load records from a file and query them
//! areadb query --data people.json --type person --filter '{"re": {"name": "^A"}}'
//!
//! # Show the effective configuration
//! AREADB__SCAN__PAGE_SIZE=50 areadb config
//! ```

use anyhow::{bail, Context};
use areadb::{telemetry, Db, DbConfig, MemoryStore};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// AreaDB - multi-tenant JSON document store
#[derive(Parser, Debug)]
#[command(name = "areadb")]
#[command(version = areadb::VERSION)]
#[command(about = "AreaDB - multi-tenant JSON document store", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "AREADB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AREADB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Also write daily rotated log files to this directory
    #[arg(long, global = true, env = "AREADB_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a filter expression against one record
    Eval(EvalArgs),

    /// Load records into an in-memory area and list one type
    Query(QueryArgs),

    /// Print the effective configuration as TOML
    Config,

    /// Show version
    Version,
}

#[derive(Args, Debug)]
struct EvalArgs {
    /// Filter expression (JSON)
    #[arg(short, long)]
    filter: String,

    /// Record (JSON object)
    #[arg(short, long)]
    record: String,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// File holding a JSON array of records
    #[arg(short, long)]
    data: PathBuf,

    /// Type the records are stored as
    #[arg(short = 't', long = "type")]
    type_name: String,

    /// Filter expression (JSON); every record when omitted
    #[arg(short, long)]
    filter: Option<String>,

    /// Area to load the records into
    #[arg(long, default_value = "local")]
    area: String,

    /// Print Prometheus metrics after the query
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = DbConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if cli.log_dir.is_some() {
        config.log.log_dir = cli.log_dir.clone();
    }
    if cli.no_color {
        config.log.ansi = false;
    }
    telemetry::init(&config.log)?;

    match cli.command {
        Commands::Eval(args) => eval_command(args),
        Commands::Query(args) => query_command(config, args).await,
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Version => {
            println!("AreaDB {}", areadb::VERSION);
            Ok(())
        }
    }
}

fn parse_json(text: &str, what: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{what} is not valid JSON"))
}

/// Eval command - print whether the record matches
fn eval_command(args: EvalArgs) -> anyhow::Result<()> {
    let filter = parse_json(&args.filter, "filter")?;
    let record = parse_json(&args.record, "record")?;
    let matched = areadb::query::evaluate(&filter, &record)?;
    println!("{matched}");
    Ok(())
}

/// Query command - load records, run one list query, print the matches
async fn query_command(config: DbConfig, args: QueryArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.data)
        .with_context(|| format!("failed to read {}", args.data.display()))?;
    let records = match parse_json(&text, "data file")? {
        Value::Array(records) => records,
        _ => bail!("data file must contain a JSON array of records"),
    };
    let filter = match &args.filter {
        Some(filter) => parse_json(filter, "filter")?,
        None => Value::Null,
    };

    let db = Db::new(Box::new(MemoryStore::new()), config);
    let session = db.issue_default_token(&args.area).await?.session;

    let loaded = records.len();
    for record in records {
        // records that already carry an id keep it
        if record.get("id").is_some() {
            db.replace(&session, &args.type_name, record).await?;
        } else {
            db.create(&session, &args.type_name, record).await?;
        }
    }
    info!(loaded, area = %session.area(), "Loaded records");

    let matched = db.list(&session, &args.type_name, &filter).await?;
    println!("{}", serde_json::to_string_pretty(&matched)?);

    if args.metrics {
        print!("{}", areadb::metrics::export_metrics());
    }
    Ok(())
}
