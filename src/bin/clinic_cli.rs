use std::{fs, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use clinic_api::{
    auth::{AuthConfig, SessionVerifier},
    cashflow::{self, CashFlowEntry, Granularity, MAX_PERIOD_DAYS},
    config,
    db,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => handle_migrate().await?,
        Commands::Token(args) => handle_token(args, cli.json)?,
        Commands::Project(args) => handle_project(args)?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "clinic-cli", about = "Clinic API maintenance and offline tools", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations using the configured database_url
    Migrate,
    /// Mint a session token for a clinic account (development use)
    Token(TokenArgs),
    /// Project cash flow from a JSON file of entries; prints JSON
    Project(ProjectArgs),
}

#[derive(Args)]
struct TokenArgs {
    #[arg(long, value_parser = clap::value_parser!(Uuid), help = "Clinic account identifier (UUID)")]
    user_id: Uuid,
}

#[derive(Args)]
struct ProjectArgs {
    #[arg(long, help = "Path to a JSON array of cash-flow entries")]
    entries: PathBuf,
    #[arg(long, value_parser = parse_decimal, default_value = "0", help = "Opening balance")]
    seed: Decimal,
    #[arg(long, help = "Number of days to project")]
    days: u32,
    #[arg(long, value_parser = parse_date, help = "First projected day (YYYY-MM-DD); defaults to today")]
    start: Option<NaiveDate>,
    #[arg(long, value_parser = parse_granularity, default_value = "daily", help = "daily, weekly or monthly")]
    granularity: Granularity,
}

#[derive(Debug, Serialize)]
struct ProjectionOutput {
    granularity: Granularity,
    projection: cashflow::CashFlowProjection,
    buckets: Vec<cashflow::ProjectionBucket>,
}

async fn handle_migrate() -> Result<()> {
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    db::run_migrations(&pool)
        .await
        .context("failed to apply migrations")?;
    println!("Migrations applied");
    Ok(())
}

fn handle_token(args: TokenArgs, json: bool) -> Result<()> {
    let cfg = config::load_config().context("failed to load configuration")?;
    let verifier = SessionVerifier::new(AuthConfig::from_app_config(&cfg));
    let token = verifier
        .issue_token(args.user_id)
        .map_err(|e| anyhow!("failed to issue token: {}", e))?;

    if json {
        print_json(&serde_json::json!({ "user_id": args.user_id, "token": token }))?;
    } else {
        println!("{}", token);
    }
    Ok(())
}

fn handle_project(args: ProjectArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.entries)
        .with_context(|| format!("failed to read {}", args.entries.display()))?;
    let output = build_projection(&args, &raw, Utc::now().date_naive())?;
    print_json(&output)
}

fn build_projection(args: &ProjectArgs, raw: &str, today: NaiveDate) -> Result<ProjectionOutput> {
    if args.days > MAX_PERIOD_DAYS {
        return Err(anyhow!("--days must be at most {}", MAX_PERIOD_DAYS));
    }

    let entries: Vec<CashFlowEntry> =
        serde_json::from_str(raw).context("entries file is not a JSON array of entries")?;
    for (index, entry) in entries.iter().enumerate() {
        entry
            .validate()
            .map_err(|e| anyhow!("entry {} is invalid: {}", index, e))?;
    }
    debug!(entries = entries.len(), "loaded cash-flow entries");

    let start = args.start.unwrap_or(today);
    let projection = cashflow::project(args.seed, &entries, start, args.days)?;
    let buckets = projection.buckets(args.granularity);
    Ok(ProjectionOutput {
        granularity: args.granularity,
        projection,
        buckets,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|e| format!("invalid amount '{}': {}", raw, e))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {}", raw, e))
}

fn parse_granularity(raw: &str) -> Result<Granularity, String> {
    Granularity::from_str(&raw.trim().to_ascii_lowercase())
        .map_err(|_| format!("unknown granularity '{}'", raw))
}
