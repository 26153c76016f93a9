use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

mod filter;
mod load;
mod models;
mod report;

use models::{Dataset, FilterCriteria};

#[derive(Parser)]
#[command(name = "problem-dashboard")]
#[command(about = "Filter and aggregate problem management records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Keep only records with one of these Status Card values
    #[arg(long)]
    status: Vec<String>,
    /// Keep only records with one of these Prioridade values
    #[arg(long)]
    priority: Vec<String>,
    /// Keep only records with one of these Módulo Impactado values
    #[arg(long)]
    module: Vec<String>,
    /// Start of the creation-date range (day-first, e.g. 01/01/2024)
    #[arg(long, value_parser = parse_cli_date, requires = "to")]
    from: Option<NaiveDate>,
    /// End of the creation-date range, inclusive
    #[arg(long, value_parser = parse_cli_date, requires = "from")]
    to: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// List filter options and the dataset's date bounds
    Options {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print indicators and aggregates for the filtered dataset
    Summary {
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
        /// Emit the full dashboard view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the filtered rows to a CSV file
    Export {
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Options { input } => {
            let dataset = load_input(Some(input))?;
            print_options("Status Card", &filter::distinct_values(&dataset, |r| &r.status));
            print_options("Prioridade", &filter::distinct_values(&dataset, |r| &r.priority));
            print_options("Módulo Impactado", &filter::distinct_values(&dataset, |r| &r.module));
            match filter::date_bounds(&dataset) {
                Some((start, end)) => println!("Período: {start} to {end}"),
                None => println!("Período: no parsable creation dates"),
            }
        }
        Commands::Summary {
            input,
            filters,
            json,
        } => {
            let dataset = load_input(input)?;
            let criteria = filters.into_criteria()?;
            let view = filter::build_view(&dataset, &criteria);

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_summary(&criteria, &view);
            }
        }
        Commands::Report {
            input,
            filters,
            out,
        } => {
            let dataset = load_input(input)?;
            let criteria = filters.into_criteria()?;
            let view = filter::build_view(&dataset, &criteria);
            let label = criteria_label(&criteria);
            let report = report::build_report(label.as_deref(), &view);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            input,
            filters,
            out,
        } => {
            let dataset = load_input(input)?;
            let criteria = filters.into_criteria()?;
            let rows = filter::filter(&dataset, &criteria);
            load::write_csv(&out, &dataset.columns, &rows)?;
            println!("Exported {} rows to {}.", rows.len(), out.display());
        }
    }

    Ok(())
}

/// No input path means no data: an empty dataset, zero aggregates. A path
/// that was given but cannot be loaded is an error.
fn load_input(input: Option<PathBuf>) -> anyhow::Result<Dataset> {
    match input {
        Some(path) => load::load_path(&path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(Dataset::empty()),
    }
}

fn parse_cli_date(raw: &str) -> Result<NaiveDate, String> {
    load::parse_creation_date(raw)
        .ok_or_else(|| format!("{raw:?} is not a valid day-first date"))
}

impl FilterArgs {
    fn into_criteria(self) -> anyhow::Result<FilterCriteria> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            anyhow::ensure!(from <= to, "--from must not be after --to");
        }
        Ok(FilterCriteria {
            status: some_if_nonempty(self.status),
            priority: some_if_nonempty(self.priority),
            module: some_if_nonempty(self.module),
            period: self.from.zip(self.to),
        })
    }
}

fn some_if_nonempty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn print_options(label: &str, values: &[String]) {
    if values.is_empty() {
        println!("{label}: (none)");
    } else {
        println!("{label}: {}", values.join(", "));
    }
}

fn print_summary(criteria: &FilterCriteria, view: &models::DashboardView) {
    let aggregates = &view.aggregates;
    match criteria_label(criteria) {
        Some(label) => println!("Filters: {label}"),
        None => println!("Filters: none"),
    }
    println!(
        "Total {} | Resolved {} | Open {}",
        aggregates.total, aggregates.resolved, aggregates.open
    );

    println!("Status:");
    for (status, count) in aggregates.status_counts.iter() {
        println!("- {status}: {count}");
    }
    println!("Priority:");
    for (priority, count) in aggregates.priority_distribution.iter() {
        println!("- {priority}: {count}");
    }
    println!("Daily created:");
    for (day, count) in aggregates.daily_series.iter() {
        println!("- {day}: {count}");
    }
}

fn criteria_label(criteria: &FilterCriteria) -> Option<String> {
    if criteria.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(values) = criteria.status.as_deref().filter(|v| !v.is_empty()) {
        parts.push(format!("status={}", values.join("|")));
    }
    if let Some(values) = criteria.priority.as_deref().filter(|v| !v.is_empty()) {
        parts.push(format!("priority={}", values.join("|")));
    }
    if let Some(values) = criteria.module.as_deref().filter(|v| !v.is_empty()) {
        parts.push(format!("module={}", values.join("|")));
    }
    if let Some((start, end)) = criteria.period {
        parts.push(format!("period={start}..{end}"));
    }
    Some(parts.join(", "))
}
