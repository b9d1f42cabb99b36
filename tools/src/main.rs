//! fee-report: headless fee reconciliation report for the scholarship
//! marketplace.
//!
//! Usage:
//!   fee-report --db marketplace.db --from 2024-06-01 --to 2024-06-30
//!   fee-report --demo --seed 7 --students 60 --exclude-test-accounts
//!   fee-report --db marketplace.db --json > report.json

mod demo;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use scholarfee_core::{
    config::EngineConfig,
    engine::{FeeEngine, Report, ReportOutcome, ReportRequest},
    ledger::SqliteLedger,
    model::ReportingWindow,
    store::FeeStore,
    summary::EntitySummary,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let students = parse_arg(&args, "--students", 40usize);
    let exclude_test_accounts = has_flag(&args, "--exclude-test-accounts");
    let json = has_flag(&args, "--json");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");
    // An in-memory database starts empty, so it always gets demo rows.
    let seed_demo = has_flag(&args, "--demo") || db == ":memory:";

    let window = match (str_arg(&args, "--from"), str_arg(&args, "--to")) {
        (None, None) => None,
        (Some(from), Some(to)) => Some(ReportingWindow::new(
            from.parse::<NaiveDate>()?,
            to.parse::<NaiveDate>()?,
        )?),
        _ => bail!("--from and --to must be given together"),
    };

    if !json {
        println!("Scholarship marketplace: fee-report");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        match window {
            Some(w) => println!("  window:    {} .. {}", w.from, w.to),
            None => println!("  window:    all time"),
        }
        println!("  exclude test accounts: {exclude_test_accounts}");
        println!();
    }

    let config = EngineConfig::load(data_dir)?;

    // For :memory: use a SQLite shared-memory URI so the ledger's own
    // connection sees the same rows as the directory connection.
    let store = if db == ":memory:" {
        FeeStore::shared_memory(&format!("feereport_{seed}_{}", std::process::id()))?
    } else {
        FeeStore::open(db)?
    };
    store.migrate()?;

    if seed_demo {
        let counts = demo::seed(&store, &config.fee_schedule, seed, students)?;
        if !json {
            println!(
                "Seeded demo data: {} universities, {} affiliates, {} sellers, {} students, {} payments",
                counts.universities, counts.affiliates, counts.sellers, counts.students, counts.payments
            );
            println!();
        }
    }

    let directory = store.load_directory()?;
    let exclusion = config.exclusion(exclude_test_accounts);
    let engine = FeeEngine::new(config, SqliteLedger::new(store.reopen()?));
    let request = ReportRequest::all_time().with_exclusion(exclusion);
    let request = match window {
        Some(w) => request.with_window(w),
        None => request,
    };

    let report = match engine.compute(&directory, &request).await {
        ReportOutcome::Completed(report) => report,
        ReportOutcome::Superseded => bail!("report request was superseded"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &Report) {
    let revenue: f64 = report.students.iter().map(|s| s.total).sum();
    println!("=== REPORT SUMMARY ===");
    println!("  students:       {}", report.students.len());
    println!("  excluded:       {} students, {} sellers, {} affiliates",
        report.excluded.students, report.excluded.sellers, report.excluded.affiliates);
    println!("  total revenue:  ${revenue:.2}");
    println!("  warnings:       {}", report.warnings.len());

    print_section("UNIVERSITIES", &report.universities);
    print_section("AFFILIATES", &report.affiliates);
    print_section("SELLERS", &report.sellers);

    if !report.warnings.is_empty() {
        println!();
        println!("=== WARNINGS ===");
        for w in &report.warnings {
            println!("  {w:?}");
        }
    }
}

fn print_section(title: &str, summaries: &[EntitySummary]) {
    println!();
    println!("=== {title} ===");
    if summaries.is_empty() {
        println!("  (none)");
        return;
    }
    for s in summaries {
        println!(
            "  {:<8} | Revenue: ${:.2} | Manual: ${:.2} | Available: ${:.2} | Paid {}/{} ({:.1}%) | Avg: ${:.2}",
            s.entity_id,
            s.total_revenue,
            s.manual_revenue,
            s.available_balance,
            s.paid_applications_count,
            s.total_applications_count,
            s.conversion_rate,
            s.average_fee,
        );
        if s.unknown_method_revenue > 0.0 {
            println!("           | Unknown method: ${:.2}", s.unknown_method_revenue);
        }
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
