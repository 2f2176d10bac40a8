//! CovidLab CLI — fetch, clean and explore the OWID COVID-19 dataset.
//!
//! Commands:
//! - `fetch` — download the raw CSV once (skipped when the file exists)
//! - `clean` — country filter + per-country forward-fill into the cleaned CSV
//! - `status` — presence, size and metadata of both artifacts
//! - `kpi`, `series`, `top` — dashboard numbers for selected locations
//! - `query` — ad-hoc SQL over the raw dataset
//! - `locations` — selectable locations and the date range

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use covidlab_core::analytics::{
    format_count, kpi_snapshot, series, top_locations, Metric, Selection, DEFAULT_LOCATIONS,
    TOP_N_DEFAULT,
};
use covidlab_core::data::{ensure_raw_dataset, ArtifactMeta, Cleaner, FetchOutcome, HttpSource};
use covidlab_core::{
    example_sql, frame_to_csv, load_dataset, DashboardConfig, LoadedDataset, QueryEngine,
};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "covidlab",
    about = "CovidLab CLI — OWID COVID-19 data pipeline and dashboard numbers"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory. Overrides the config file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the raw dataset unless it is already present.
    Fetch,
    /// Clean the raw dataset into the country-only, forward-filled artifact.
    Clean,
    /// Report presence, size and metadata of the raw and cleaned artifacts.
    Status,
    /// Latest totals summed over the selected locations.
    Kpi {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Per-location time series of one metric, as CSV.
    Series {
        #[command(flatten)]
        filter: FilterArgs,

        /// total_cases, total_deaths or people_fully_vaccinated.
        #[arg(long, default_value = "total_cases", value_parser = parse_metric)]
        metric: Metric,
    },
    /// Locations ranked by the latest value of a metric.
    Top {
        /// total_cases, total_deaths or people_fully_vaccinated.
        #[arg(long, default_value = "total_cases", value_parser = parse_metric)]
        metric: Metric,

        /// Number of locations (5 to 25).
        #[arg(long, default_value_t = TOP_N_DEFAULT)]
        n: usize,

        /// Read the raw file even if a cleaned artifact exists.
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
    /// Run SQL against the raw dataset.
    Query {
        /// SQL statement. The table is named after `table_name` in the config.
        sql: Option<String>,

        /// Print and run the example query.
        #[arg(long, default_value_t = false, conflicts_with = "sql")]
        example: bool,
    },
    /// List selectable locations and the dataset's date range.
    Locations {
        /// Read the raw file even if a cleaned artifact exists.
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Location to include; repeat for several. Defaults to United States, India and Brazil.
    #[arg(long = "location", default_values = DEFAULT_LOCATIONS)]
    locations: Vec<String>,

    /// Start date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    end: Option<String>,

    /// Read the raw file even if a cleaned artifact exists.
    #[arg(long, default_value_t = false)]
    raw: bool,
}

impl FilterArgs {
    fn selection(&self) -> Result<Selection> {
        let start = parse_date(self.start.as_deref())?;
        let end = parse_date(self.end.as_deref())?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                bail!("--start {s} is after --end {e}");
            }
        }
        Ok(Selection::new(self.locations.iter().cloned()).with_range(start, end))
    }
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Fetch => run_fetch(&config),
        Commands::Clean => run_clean(&config),
        Commands::Status => run_status(&config),
        Commands::Kpi { filter } => run_kpi(&config, &filter),
        Commands::Series { filter, metric } => run_series(&config, &filter, metric),
        Commands::Top { metric, n, raw } => run_top(&config, metric, n, raw),
        Commands::Query { sql, example } => run_query(&config, sql, example),
        Commands::Locations { raw } => run_locations(&config, raw),
    }
}

fn resolve_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<DashboardConfig> {
    let config = match path {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    Ok(match data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    Ok(s.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?)
}

fn parse_metric(s: &str) -> Result<Metric, String> {
    s.parse().map_err(|e: covidlab_core::analytics::AnalyticsError| e.to_string())
}

fn http_source(config: &DashboardConfig) -> Result<HttpSource> {
    Ok(HttpSource::new(config.timeout())?)
}

fn load(config: &DashboardConfig, raw: bool) -> Result<LoadedDataset> {
    let source = http_source(config)?;
    let loaded = load_dataset(config, &source, !raw)?;
    info!(source = %loaded.source, rows = loaded.dataset.height(), "dataset ready");
    Ok(loaded)
}

fn run_fetch(config: &DashboardConfig) -> Result<()> {
    let source = http_source(config)?;
    let raw_path = config.raw_path();

    match ensure_raw_dataset(&source, &raw_path, &config.source_url)? {
        FetchOutcome::AlreadyPresent => {
            println!("Raw dataset already present: {}", raw_path.display())
        }
        FetchOutcome::Downloaded { bytes } => println!(
            "Downloaded {} to {}",
            format_size(bytes as u64),
            raw_path.display()
        ),
    }
    Ok(())
}

fn run_clean(config: &DashboardConfig) -> Result<()> {
    let source = http_source(config)?;
    ensure_raw_dataset(&source, &config.raw_path(), &config.source_url)?;

    let clean_path = config.clean_path();
    let report = Cleaner::owid().clean(&config.raw_path(), &clean_path)?;

    println!();
    println!("=== Cleaning Report ===");
    println!("Output:         {}", clean_path.display());
    println!("Raw rows:       {}", report.raw_rows);
    println!("Kept rows:      {}", report.kept_rows);
    println!("Dropped rows:   {} (no continent)", report.dropped_rows);
    println!("Locations:      {}", report.entities);
    println!("Hash:           {}", report.data_hash);
    println!();
    println!("--- Forward-filled values ---");
    for (field, count) in &report.filled {
        println!("{field:<26} {count:>10}");
    }
    println!();
    Ok(())
}

fn run_status(config: &DashboardConfig) -> Result<()> {
    println!("Data directory: {}", config.data_dir.display());
    println!();
    println!("{:<8} {:<10} {:>10}  {}", "Artifact", "State", "Size", "Path");
    println!("{}", "-".repeat(60));

    for (label, path) in [("raw", config.raw_path()), ("cleaned", config.clean_path())] {
        match std::fs::metadata(&path) {
            Ok(meta) => println!(
                "{:<8} {:<10} {:>10}  {}",
                label,
                "present",
                format_size(meta.len()),
                path.display()
            ),
            Err(_) => println!("{:<8} {:<10} {:>10}  {}", label, "missing", "-", path.display()),
        }
    }

    let clean_path = config.clean_path();
    if clean_path.exists() {
        println!();
        match ArtifactMeta::read(&clean_path) {
            Some(meta) => {
                println!("Cleaned at:     {}", meta.cleaned_at.format("%Y-%m-%d %H:%M:%S"));
                println!("From:           {}", meta.raw_path.display());
                println!(
                    "Rows:           {} kept of {} ({} locations)",
                    meta.report.kept_rows, meta.report.raw_rows, meta.report.entities
                );
                println!("Hash:           {}", meta.report.data_hash);
            }
            None => println!("(no metadata for cleaned artifact)"),
        }
    }
    Ok(())
}

fn run_kpi(config: &DashboardConfig, filter: &FilterArgs) -> Result<()> {
    let selection = filter.selection()?;
    let loaded = load(config, filter.raw)?;
    let view = loaded.dataset.select(&selection)?;

    let kpi = kpi_snapshot(&view)?;
    println!("Source:                      {}", loaded.source);
    println!("{kpi}");
    Ok(())
}

fn run_series(config: &DashboardConfig, filter: &FilterArgs, metric: Metric) -> Result<()> {
    let selection = filter.selection()?;
    let loaded = load(config, filter.raw)?;
    let view = loaded.dataset.select(&selection)?;

    let out = series(&view, metric)?;
    print!("{}", frame_to_csv(&out)?);
    Ok(())
}

fn run_top(config: &DashboardConfig, metric: Metric, n: usize, raw: bool) -> Result<()> {
    let loaded = load(config, raw)?;
    let top = top_locations(&loaded.dataset, metric, n)?;
    print_ranking(&top, metric)
}

fn print_ranking(top: &DataFrame, metric: Metric) -> Result<()> {
    let locations = top.column("location")?.str()?;
    let values = top.column(metric.column())?.f64()?;

    println!("{:>4}  {:<32} {:>18}", "#", "Location", metric.column());
    println!("{}", "-".repeat(56));
    for (i, (location, value)) in locations.into_iter().zip(values.into_iter()).enumerate() {
        println!(
            "{:>4}  {:<32} {:>18}",
            i + 1,
            location.unwrap_or(""),
            format_count(value)
        );
    }
    Ok(())
}

fn run_query(config: &DashboardConfig, sql: Option<String>, example: bool) -> Result<()> {
    let table = config.table_name.as_str();
    let sql = match (sql, example) {
        (Some(sql), _) => sql,
        (None, true) => {
            let sql = example_sql(table);
            println!("{sql}");
            println!();
            sql
        }
        (None, false) => bail!("provide a SQL statement or pass --example"),
    };

    let source = http_source(config)?;
    ensure_raw_dataset(&source, &config.raw_path(), &config.source_url)?;

    let result = QueryEngine::over_raw(&config.raw_path(), table)
        .and_then(|mut engine| engine.execute(&sql));

    match result {
        Ok(df) => {
            println!("{df}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Query failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run_locations(config: &DashboardConfig, raw: bool) -> Result<()> {
    let loaded = load(config, raw)?;
    let locations = loaded.dataset.locations()?;

    if let Some((first, last)) = loaded.dataset.date_range()? {
        println!("Dates: {first} to {last}");
    }
    println!("Locations ({}):", locations.len());
    for location in &locations {
        println!("  {location}");
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
