use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};

use decile_tracker::config::{PeriodChoice, Settings, DEFAULT_CONFIG_FILE};
use decile_tracker::data::classify::classify;
use decile_tracker::data::filter::{DecileCriteria, RegionFilter, SectorFilter, ViewFilter};
use decile_tracker::data::model::{StockRecord, StockTable};
use decile_tracker::data::summary;
use decile_tracker::export::{self, ExportFormat};
use decile_tracker::source::LocalFolderSource;
use decile_tracker::state::SessionStore;
use decile_tracker::sync::sync;

#[derive(Parser)]
#[command(name = "decile-tracker")]
#[command(about = "Track stock decile movements across regional snapshot files")]
#[command(version)]
struct Cli {
    /// Folder holding the snapshot files
    #[arg(long, env = "DECILE_FOLDER", global = true)]
    folder: Option<PathBuf>,

    /// Sub-folder of --folder to sync
    #[arg(long, global = true)]
    subfolder: Option<String>,

    /// Path to the JSON settings file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the region and date read from each filename
    Classify {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Sync the folder and list the files seen
    Files,
    /// Sync and show the stocks passing the filters
    Stocks {
        #[command(flatten)]
        view: ViewArgs,
        /// Print matching records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search tickers and company names, grouped by region
    Search {
        term: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Per-sector breakdown by region
    Sectors {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Write the filtered stocks to a file
    Export {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, value_enum, default_value_t)]
        format: ExportFormat,
        /// Output path (default: decile_export_YYYYMMDD.<ext>)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
struct ViewArgs {
    /// Region label, or "All Regions"
    #[arg(long)]
    region: Option<String>,

    /// Sector name, or "All Sectors"
    #[arg(long)]
    sector: Option<String>,

    /// Decile movement criteria, e.g. "Entering Top 2 Deciles"
    #[arg(long)]
    criteria: Option<String>,

    /// Look-back window ending today
    #[arg(long, value_enum)]
    period: Option<PeriodChoice>,

    /// Start of a custom window (implies --period custom)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End of a custom window (implies --period custom)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Ticker or company name substring
    #[arg(long)]
    search: Option<String>,
}

impl ViewArgs {
    /// Merge flags over settings-file defaults.
    fn to_filter(&self, settings: &Settings, today: NaiveDate) -> Result<ViewFilter> {
        let region = match self.region.as_ref().or(settings.region.as_ref()) {
            Some(label) => label.parse::<RegionFilter>()?,
            None => RegionFilter::All,
        };
        let sector = self
            .sector
            .as_deref()
            .or(settings.sector.as_deref())
            .map(SectorFilter::from)
            .unwrap_or_default();
        let criteria = match self.criteria.as_ref().or(settings.criteria.as_ref()) {
            Some(label) => label.parse::<DecileCriteria>()?,
            None => DecileCriteria::AllMovements,
        };

        let custom_bounds = self.from.is_some() || self.to.is_some();
        let period = match (self.period, custom_bounds) {
            (Some(choice), _) => choice,
            (None, true) => PeriodChoice::Custom,
            (None, false) => settings.period.unwrap_or_default(),
        };
        if custom_bounds && period != PeriodChoice::Custom {
            bail!("--from/--to only apply with --period custom");
        }
        let range = period.resolve(self.from, self.to, today).date_range(today);
        if range.start > range.end {
            bail!("custom window starts after it ends ({} > {})", range.start, range.end);
        }

        Ok(ViewFilter {
            region,
            sector,
            date_range: Some(range),
            criteria,
            search: self.search.clone().unwrap_or_default(),
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;
    let today = Local::now().date_naive();

    match &cli.command {
        Command::Classify { names } => print_classified(names),
        Command::Files => print_files(&load_session(&cli, &settings)?),
        Command::Stocks { view, json } => {
            let filter = view.to_filter(&settings, today)?;
            let table = load_session(&cli, &settings)?.view(&filter);
            if *json {
                serde_json::to_writer_pretty(io::stdout().lock(), &table.records)?;
                println!();
            } else {
                if filter.criteria != DecileCriteria::AllMovements {
                    println!("{}: {}", filter.criteria, filter.criteria.description());
                }
                print_stocks(&table)?;
            }
        }
        Command::Search { term, view } => {
            let mut filter = view.to_filter(&settings, today)?;
            filter.search = term.clone();
            print_search(&load_session(&cli, &settings)?.view(&filter), term)?;
        }
        Command::Sectors { view } => {
            let filter = view.to_filter(&settings, today)?;
            print_sectors(&load_session(&cli, &settings)?.view(&filter));
        }
        Command::Export { view, format, out } => {
            let filter = view.to_filter(&settings, today)?;
            let table = load_session(&cli, &settings)?.view(&filter);
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(export::default_export_name(today, *format)));
            write_export(&path, *format, &table.records.iter().collect::<Vec<_>>())?;
            println!("Wrote {} records to {}", table.len(), path.display());
        }
    }
    Ok(())
}

/// Sync the configured folder into a fresh session.
fn load_session(cli: &Cli, settings: &Settings) -> Result<SessionStore> {
    let folder = cli
        .folder
        .as_ref()
        .or(settings.folder.as_ref())
        .context("no snapshot folder given (use --folder, DECILE_FOLDER or the settings file)")?;
    let subfolder = cli.subfolder.as_deref().or(settings.subfolder.as_deref());

    let source = LocalFolderSource::new(folder);
    let report = sync(&source, subfolder)
        .with_context(|| format!("Failed to sync {}", folder.display()))?;
    for warning in &report.warnings {
        eprintln!("warning: {}: {}", warning.filename, warning.error);
    }

    let mut store = SessionStore::default();
    store.apply_sync(report);
    Ok(store)
}

fn write_export(path: &Path, format: ExportFormat, records: &[&StockRecord]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        ExportFormat::Csv => export::write_csv(&mut writer, records.iter().copied())
            .with_context(|| format!("Failed to write CSV to {}", path.display()))?,
        ExportFormat::Parquet => export::write_parquet(&mut writer, records)
            .with_context(|| format!("Failed to write Parquet to {}", path.display()))?,
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

fn date_text(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

fn print_classified(names: &[String]) {
    for name in names {
        let meta = classify(name);
        println!("{:<16} {:<12} {}", meta.region, date_text(meta.date), meta.filename);
    }
}

fn print_files(store: &SessionStore) {
    let counts = summary::file_summary(&store.synced_files);
    println!(
        "{} files ({} classified, {} unclassified)",
        counts.total, counts.classified, counts.unclassified
    );
    for entry in &store.synced_files {
        println!(
            "{:<16} {:<12} {:<26} {}",
            entry.region,
            date_text(entry.date),
            entry.modified_time.as_deref().unwrap_or("-"),
            entry.filename
        );
    }
}

fn print_stocks(table: &StockTable) -> Result<()> {
    let overview = summary::overview(table);
    println!(
        "{} stocks, {} regions, {} sectors",
        overview.total_stocks, overview.regions, overview.sectors
    );
    let regions: Vec<String> = summary::region_distribution(table)
        .iter()
        .map(|(region, n)| format!("{region}: {n}"))
        .collect();
    if !regions.is_empty() {
        println!("{}", regions.join("  "));
    }
    let deciles = summary::decile_distribution(table);
    if !deciles.is_empty() {
        let parts: Vec<String> = deciles.iter().map(|(d, n)| format!("D{d}: {n}")).collect();
        println!("{}", parts.join("  "));
    }
    if table.is_empty() {
        println!("No stocks match the current filters.");
        return Ok(());
    }
    let records: Vec<&StockRecord> = table.records.iter().collect();
    println!("{}", export::pretty_table(&records)?);
    Ok(())
}

fn print_search(table: &StockTable, term: &str) -> Result<()> {
    if table.is_empty() {
        println!("No stocks found matching '{term}'");
        return Ok(());
    }
    println!("Found {} results for '{term}'", table.len());
    let groups = summary::group_by_region(table)
        .into_iter()
        .zip(summary::tickers_by_region(table, 10));
    for ((region, rows), (_, shown, total)) in groups {
        println!("\n{region} ({} stocks)", rows.len());
        if !shown.is_empty() {
            let more = total - shown.len();
            let suffix = if more > 0 { format!(" (+{more} more)") } else { String::new() };
            println!("Tickers: {}{suffix}", shown.join(", "));
        }
        println!("{}", export::pretty_table(&rows)?);
    }
    Ok(())
}

fn print_sectors(table: &StockTable) {
    if table.is_empty() {
        println!("No stocks match the current filters.");
        return;
    }
    let counts = summary::sector_region_counts(table);
    for (region, rows) in summary::group_by_region(table) {
        let all = summary::group_summary(rows.iter().copied());
        println!(
            "\n{region}: {} stocks, avg decile {}, {} in top 2, {} improving, avg score {}",
            all.count,
            fmt_mean(all.avg_decile),
            all.top_two,
            all.improving,
            fmt_mean(all.avg_score)
        );
        let in_region = counts
            .range((region, String::new())..)
            .take_while(|((r, _), _)| *r == region);
        for ((_, sector), count) in in_region {
            let stats = summary::group_summary(
                rows.iter()
                    .copied()
                    .filter(|r| r.sector.as_deref() == Some(sector.as_str())),
            );
            println!(
                "  {sector:<28} {count:>5}  avg decile {:>5}  top 2 {:>4}  improving {:>4}",
                fmt_mean(stats.avg_decile),
                stats.top_two,
                stats.improving
            );
        }
    }
}

fn fmt_mean(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}
