use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

mod config;
mod db;
mod error;
mod ledger;
mod metrics;
mod models;
mod report;
mod sheet;
mod store;

use config::SessionConfig;
use db::PgStore;
use models::{Channel, SalesRecord};
use sheet::SheetStore;
use store::LedgerStore;

#[derive(Parser)]
#[command(name = "gym-sales-ledger")]
#[command(about = "Daily sales ledger, targets and leaderboard for the club's sales staff", long_about = None)]
struct Cli {
    /// Use a CSV sheet instead of the Postgres table behind DATABASE_URL
    #[arg(long, global = true)]
    sheet: Option<PathBuf>,
    /// JSON file with the monthly target and staff roster
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the monthly target for this run
    #[arg(long, global = true)]
    target: Option<f64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the ledger table
    InitDb,
    /// Load a week of realistic activity
    Seed,
    /// Append records from a CSV sheet, skipping ones already present
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Write the whole ledger to a CSV sheet. An existing file that is not a
    /// readable ledger sheet is deleted and replaced.
    Export {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record one staff member's activity for a day
    Add {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        staff: String,
        #[arg(long, default_value_t = 0)]
        walk_in_leads: u32,
        #[arg(long, default_value_t = 0)]
        walk_in_sales: u32,
        #[arg(long, default_value_t = 0)]
        referral_leads: u32,
        #[arg(long, default_value_t = 0)]
        referral_sales: u32,
        #[arg(long, default_value_t = 0)]
        cold_call_leads: u32,
        #[arg(long, default_value_t = 0)]
        cold_call_sales: u32,
        #[arg(long, default_value_t = 0)]
        social_leads: u32,
        #[arg(long, default_value_t = 0)]
        social_sales: u32,
        #[arg(long, default_value_t = 0)]
        web_leads: u32,
        #[arg(long, default_value_t = 0)]
        web_sales: u32,
        #[arg(long, default_value_t = 0)]
        active_renewals: u32,
        #[arg(long, default_value_t = 0)]
        passive_renewals: u32,
        #[arg(long, default_value_t = 0.0)]
        collected: f64,
    },
    /// Delete one record by row number (as shown by `list`) or by id
    #[command(group(
        ArgGroup::new("which")
            .args(["row", "id"])
            .required(true)
            .multiple(false)
    ))]
    Delete {
        #[arg(long)]
        row: Option<usize>,
        #[arg(long)]
        id: Option<Uuid>,
    },
    /// Show every record with its row number
    List,
    /// Collected amount against the monthly target
    Overview {
        /// Restrict to one month, e.g. 2024-03
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Conversion per lead channel, club-wide or for one staff member
    Channels {
        #[arg(long)]
        staff: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Collected amount and sales per staff member
    Leaderboard {
        #[arg(long)]
        json: bool,
    },
    /// Totals for a single day
    Daily {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        json: bool,
    },
    /// Day summary formatted for the staff WhatsApp group
    Whatsapp {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
        #[arg(long, default_value = "sales-report.md")]
        out: PathBuf,
    },
    /// Show or change the staff roster and monthly target in effect
    Roster {
        #[arg(long)]
        add: Vec<String>,
        #[arg(long)]
        remove: Vec<String>,
        /// Write the resulting settings to this JSON file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn parse_month(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
        .map_err(|_| format!("'{value}' is not a month like 2024-03"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn in_month(records: Vec<SalesRecord>, month: Option<NaiveDate>) -> Vec<SalesRecord> {
    match month {
        Some(month) => metrics::for_month(&records, month.year(), month.month()),
        None => records,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Cli {
        sheet,
        config: config_path,
        target,
        command,
    } = Cli::parse();

    let mut config = match config_path {
        Some(path) => SessionConfig::load(&path)
            .with_context(|| format!("failed to load session config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(target) = target {
        config.set_monthly_target(target)?;
    }

    match sheet {
        Some(path) => run(&SheetStore::new(path), &config, command).await,
        None => {
            let database_url = std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set when no --sheet is given")?;
            let store = tokio::time::timeout(config.store_timeout(), PgStore::connect(&database_url))
                .await
                .context("timed out connecting to Postgres")?
                .context("failed to connect to Postgres")?;
            run(&store, &config, command).await
        }
    }
}

async fn run<S: LedgerStore>(
    store: &S,
    config: &SessionConfig,
    command: Commands,
) -> anyhow::Result<()> {
    let timeout = config.store_timeout();

    match command {
        Commands::InitDb => {
            store.init().await?;
            println!("Ledger ready.");
        }
        Commands::Seed => {
            let snapshot = store::read_with_timeout(store, timeout).await?;
            let today = Utc::now().date_naive();
            let (records, added) = ledger::merge_records(&snapshot.records, db::seed_records(today));
            store::write_with_timeout(store, &records, snapshot.version, timeout).await?;
            println!("Seed data inserted ({added} records).");
        }
        Commands::Import { csv } => {
            let incoming = SheetStore::new(&csv)
                .read_for_import()
                .await
                .with_context(|| format!("failed to read {}", csv.display()))?;
            for record in &incoming {
                if !config.staff_roster.contains(&record.staff_name) {
                    log::warn!(
                        "importing record {} for '{}', who is not on the roster",
                        record.id,
                        record.staff_name
                    );
                }
            }

            let snapshot = store::read_with_timeout(store, timeout).await?;
            let (records, added) = ledger::merge_records(&snapshot.records, incoming);
            store::write_with_timeout(store, &records, snapshot.version, timeout).await?;
            println!("Inserted {added} records from {}.", csv.display());
        }
        Commands::Export { csv } => {
            let snapshot = store::read_with_timeout(store, timeout).await?;
            let target = SheetStore::new(&csv);
            let version = match target.read().await {
                Ok(existing) => existing.version,
                Err(err) => {
                    log::warn!("replacing unreadable sheet {}: {err}", csv.display());
                    tokio::fs::remove_file(&csv).await?;
                    0
                }
            };
            target.write(&snapshot.records, version).await?;
            println!(
                "Exported {} records to {}.",
                snapshot.records.len(),
                target.path().display()
            );
        }
        Commands::Add {
            date,
            staff,
            walk_in_leads,
            walk_in_sales,
            referral_leads,
            referral_sales,
            cold_call_leads,
            cold_call_sales,
            social_leads,
            social_sales,
            web_leads,
            web_sales,
            active_renewals,
            passive_renewals,
            collected,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let record = SalesRecord::new(date, staff)
                .with_channel(Channel::WalkIn, walk_in_leads, walk_in_sales)
                .with_channel(Channel::Referral, referral_leads, referral_sales)
                .with_channel(Channel::ColdCall, cold_call_leads, cold_call_sales)
                .with_channel(Channel::Social, social_leads, social_sales)
                .with_channel(Channel::Web, web_leads, web_sales)
                .with_renewals(active_renewals, passive_renewals)
                .with_collected(collected);
            let id = record.id;
            let staff_name = record.staff_name.clone();

            let snapshot = store::read_with_timeout(store, timeout).await?;
            let records = ledger::append_record(&snapshot.records, record, &config.staff_roster)?;
            store::write_with_timeout(store, &records, snapshot.version, timeout).await?;
            println!("Saved record {id} for {staff_name} on {date}.");
        }
        Commands::Delete { row, id } => {
            // Positions are only meaningful against the table as it is now.
            let snapshot = store::read_with_timeout(store, timeout).await?;
            let records = match (row, id) {
                (Some(row), _) => ledger::delete_record(&snapshot.records, row)?,
                (None, Some(id)) => ledger::delete_record_by_id(&snapshot.records, id)?,
                (None, None) => anyhow::bail!("pass --row or --id"),
            };
            store::write_with_timeout(store, &records, snapshot.version, timeout).await?;
            println!("Deleted 1 record, {} remain.", records.len());
        }
        Commands::List => {
            let snapshot = store::read_or_empty(store, timeout).await;
            if snapshot.records.is_empty() {
                println!("No sales data.");
                return Ok(());
            }

            for (row, record) in snapshot.records.iter().enumerate() {
                println!(
                    "{row:>4}  {}  {}  {:<10} leads {:>3}  sales {:>3}  collected {} {}",
                    record.id,
                    record.date,
                    record.staff_name,
                    record.leads_in(),
                    record.total_sales(),
                    report::format_amount(record.collected),
                    report::CURRENCY
                );
            }
        }
        Commands::Overview { month, json } => {
            let snapshot = store::read_or_empty(store, timeout).await;
            let records = in_month(snapshot.records, month);
            let kpis = metrics::club_kpis(&records, config.monthly_target);

            if json {
                return print_json(&kpis);
            }
            if records.is_empty() {
                println!("No sales data.");
            }
            println!(
                "Collected: {} {}",
                report::format_amount(kpis.total_collected),
                report::CURRENCY
            );
            println!(
                "Target:    {} {}",
                report::format_amount(kpis.target),
                report::CURRENCY
            );
            println!(
                "Remaining: {} {}",
                report::format_amount(kpis.remaining),
                report::CURRENCY
            );
            println!("Progress:  {:.1}%", kpis.progress() * 100.0);
        }
        Commands::Channels { staff, json } => {
            let snapshot = store::read_or_empty(store, timeout).await;

            match staff {
                Some(staff) => {
                    let breakdown = metrics::staff_channel_breakdown(&snapshot.records, &staff);
                    if json {
                        return print_json(&breakdown);
                    }
                    println!("Channels for {}:", breakdown.staff_name);
                    for row in &breakdown.channels {
                        println!(
                            "- {}: {} leads, {} sales ({:.1}%)",
                            row.channel.label(),
                            row.leads_in,
                            row.sales,
                            row.conversion_pct
                        );
                    }
                    match breakdown.best_channel {
                        Some(channel) => println!("Best channel: {}", channel.label()),
                        None => println!("Best channel: none"),
                    }
                }
                None => {
                    let rows = metrics::channel_conversion(&snapshot.records);
                    if json {
                        return print_json(&rows);
                    }
                    for row in &rows {
                        println!(
                            "- {}: {} leads, {} sales ({:.1}%)",
                            row.channel.label(),
                            row.leads_in,
                            row.sales,
                            row.conversion_pct
                        );
                    }
                }
            }
        }
        Commands::Leaderboard { json } => {
            let snapshot = store::read_or_empty(store, timeout).await;
            let rows = metrics::staff_leaderboard(&snapshot.records);

            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No sales data.");
                return Ok(());
            }

            println!("Staff leaderboard:");
            for row in &rows {
                println!(
                    "- {}{}: {} {} across {} sales",
                    row.staff_name,
                    if row.top_performer { " *" } else { "" },
                    report::format_amount(row.total_collected),
                    report::CURRENCY,
                    row.total_sales
                );
            }
        }
        Commands::Daily { date, json } => {
            let snapshot = store::read_or_empty(store, timeout).await;
            let summary = metrics::daily_summary(&snapshot.records, date);

            if json {
                return print_json(&summary);
            }
            match summary {
                None => println!("No activity recorded on {date}."),
                Some(summary) => {
                    println!(
                        "{}: {} {} collected, {} sales",
                        summary.date,
                        report::format_amount(summary.total_collected),
                        report::CURRENCY,
                        summary.total_sales_count
                    );
                    for line in &summary.lines {
                        println!(
                            "- {}: {} leads / {} sales",
                            line.staff_name, line.leads_in, line.sales_count
                        );
                    }
                }
            }
        }
        Commands::Whatsapp { date } => {
            let snapshot = store::read_or_empty(store, timeout).await;
            let text = match metrics::daily_summary(&snapshot.records, date) {
                Some(summary) => report::format_whatsapp_report(&summary, date),
                None => report::format_no_activity(date),
            };
            print!("{text}");
        }
        Commands::Report { month, out } => {
            let snapshot = store::read_or_empty(store, timeout).await;
            let period = month
                .map(|month| month.format("%Y-%m").to_string())
                .unwrap_or_else(|| "all time".to_string());
            let records = in_month(snapshot.records, month);
            let report = report::build_report(config, &records, &period);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Roster { add, remove, save } => {
            let mut config = config.clone();
            for name in &add {
                config.staff_roster.add(name)?;
            }
            for name in &remove {
                config.staff_roster.remove(name)?;
            }
            if let Some(path) = save {
                config
                    .save(&path)
                    .with_context(|| format!("failed to save session config {}", path.display()))?;
                println!("Settings saved to {}.", path.display());
            }

            println!(
                "Monthly target: {} {}",
                report::format_amount(config.monthly_target),
                report::CURRENCY
            );
            println!("Staff ({}):", config.staff_roster.len());
            if config.staff_roster.is_empty() {
                println!("- (none, `add` will reject every record)");
            }
            for name in config.staff_roster.iter() {
                println!("- {name}");
            }
        }
    }

    Ok(())
}
