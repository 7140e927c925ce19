//! Standalone checker for bot configuration files.
//!
//! Validates the JSON configuration and, optionally, fetches every
//! configured worksheet to confirm it is reachable and parses.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use balance_bot::config::BotConfig;
use balance_bot::sheets::{
    HttpSnapshotFetcher, SheetSource, SheetsApiFetcher, SheetsError, SheetsRepository,
    SnapshotFetcher,
};

/// Bot configuration checker.
#[derive(Parser, Debug)]
#[command(name = "check_sheets")]
#[command(about = "Validates the balance bot configuration and its spreadsheets")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file to validate.
    #[arg(short, long, default_value = "bot_config.json")]
    file: String,

    /// Also download every configured worksheet.
    #[arg(long)]
    fetch: bool,

    /// Request timeout in seconds when fetching.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Generate an example configuration file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show the parsed records of every sheet.
    #[arg(short, long)]
    verbose: bool,

    /// Sheets API access token for reading investor sheets that are not
    /// shared by link.
    #[arg(long)]
    access_token: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    println!("Validating: {}", args.file);
    let config = match BotConfig::load_from_file(&args.file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let errors = config.validate_all();
    for e in &errors {
        println!("  ✗ Error: {e}");
    }
    if !errors.is_empty() {
        println!("\n✗ Validation failed: {} error(s)", errors.len());
        return ExitCode::FAILURE;
    }

    println!("✓ Configuration is valid");
    println!(
        "  Roles: {} super users, {} managers, {} investors",
        config.roles.super_users.len(),
        config.roles.managers.len(),
        config.roles.investors.len()
    );
    println!(
        "  Thresholds: containers above {}, lists from {}",
        config.container_threshold, config.list_minimum
    );

    if !args.fetch {
        return ExitCode::SUCCESS;
    }

    println!();
    let timeout = Duration::from_secs(args.timeout);
    match check_sheets(&config, timeout, args.access_token.as_deref(), args.verbose).await {
        0 => {
            println!("\n✓ All sheets are reachable");
            ExitCode::SUCCESS
        }
        failures => {
            println!("\n✗ {failures} sheet(s) could not be read");
            ExitCode::FAILURE
        }
    }
}

/// Fetches every sheet and returns the number of failures.
async fn check_sheets(
    config: &BotConfig,
    timeout: Duration,
    access_token: Option<&str>,
    verbose: bool,
) -> usize {
    let repo = match build_repository(config, timeout, access_token) {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("✗ Failed to build HTTP client: {e}");
            return 1;
        }
    };

    let mut failures = 0;

    match repo.balances().await {
        Ok(records) => {
            let keyed = records.iter().filter(|r| r.has_key()).count();
            println!("✓ Balances: {} customers ({keyed} with a usable phone)", records.len());
            if verbose {
                for r in &records {
                    println!("    {} {} [{}] {}", r.code, r.name, r.list_name, r.amount);
                }
            }
        }
        Err(e) => {
            failures += 1;
            println!("✗ Balances: {e}");
        }
    }

    match repo.containers().await {
        Ok(records) => {
            println!("✓ Containers: {} visible charges", records.len());
            if verbose {
                for r in &records {
                    println!("    {} {} {}", r.code, r.name, r.amount);
                }
            }
        }
        Err(e) => {
            failures += 1;
            println!("✗ Containers: {e}");
        }
    }

    for investor in &config.investors {
        if !check_investor(&repo, &investor.name, &investor.sheet, verbose).await {
            failures += 1;
        }
    }

    failures
}

fn build_repository(
    config: &BotConfig,
    timeout: Duration,
    access_token: Option<&str>,
) -> Result<SheetsRepository, SheetsError> {
    let public: Arc<dyn SnapshotFetcher> = Arc::new(HttpSnapshotFetcher::new(timeout)?);
    let repo = SheetsRepository::new(
        public,
        config.balances.clone(),
        config.containers.clone(),
        config.container_threshold,
    );

    Ok(match access_token {
        Some(token) => {
            repo.with_private_fetcher(Arc::new(SheetsApiFetcher::new(token, timeout)?))
        }
        None => repo,
    })
}

/// Reads the profit table with the first data column.
async fn check_investor(
    repo: &SheetsRepository,
    name: &str,
    sheet: &SheetSource,
    verbose: bool,
) -> bool {
    match repo.investor_profit(sheet, 1, "-").await {
        Ok(entries) => {
            println!("✓ Investor {name}: {} profit lines", entries.len());
            if verbose {
                for entry in &entries {
                    println!("    {}", entry.description);
                }
            }
            true
        }
        Err(e) => {
            println!("✗ Investor {name}: {e}");
            false
        }
    }
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = BotConfig::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example configuration written to: {output_path}");
            println!("\nReplace the document ids and Telegram user ids before use.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}
