//! sheetmetrics command line tool
//!
//! 月次ワークブックのディレクトリから科室別指標を集計し、レポートを出力します。

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use sheetmetrics::{
    convert_directory, emit_reports, render_summary_table, write_entity_sheets, write_flat_table,
    ConfigFile, ReportDocument, SheetMetricsError,
};
use tracing::{info, warn};

/// sheetmetrics command line arguments
#[derive(Parser, Debug)]
#[command(name = "sheetmetrics")]
#[command(about = "Aggregate per-department metrics from monthly Excel reports")]
struct Cli {
    /// Log level (tracing env-filter syntax, e.g. "info" or "sheetmetrics=debug")
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate monthly workbooks into JSON (and optional xlsx) reports
    Aggregate {
        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory containing the monthly workbooks
        #[arg(short, long)]
        source_dir: Option<PathBuf>,

        /// Department to aggregate (repeatable, replaces the config list)
        #[arg(short, long = "entity")]
        entities: Vec<String>,

        /// Metric to aggregate (repeatable, replaces the config list)
        #[arg(short, long = "metric")]
        metrics: Vec<String>,

        /// Directory for the generated reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Convert every .xls workbook in a directory to .xlsx
    ConvertXls {
        /// Directory containing .xls files
        dir: PathBuf,

        /// Keep the .xls files after conversion
        #[arg(long)]
        keep_source: bool,
    },

    /// Export a JSON report to a spreadsheet
    JsonToXlsx {
        /// Full or simple JSON report
        report: PathBuf,

        /// Output file (defaults to the report path with an .xlsx extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write one sheet per department instead of a flat table
        #[arg(long)]
        per_entity: bool,

        /// Title prefix for per-department sheets (e.g. "2024年")
        #[arg(long, default_value = "")]
        title_prefix: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.as_str())
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Command::Aggregate {
            config,
            source_dir,
            entities,
            metrics,
            output_dir,
        } => aggregate(config, source_dir, entities, metrics, output_dir),
        Command::ConvertXls { dir, keep_source } => convert_xls(dir, keep_source),
        Command::JsonToXlsx {
            report,
            output,
            per_entity,
            title_prefix,
        } => json_to_xlsx(report, output, per_entity, &title_prefix),
    };

    if let Err(e) = result {
        handle_error(e);
        process::exit(1);
    }
}

fn aggregate(
    config_path: Option<PathBuf>,
    source_dir: Option<PathBuf>,
    entities: Vec<String>,
    metrics: Vec<String>,
    output_dir: Option<PathBuf>,
) -> Result<(), SheetMetricsError> {
    // 設定ファイルを読み込み、コマンドライン引数で上書きする
    let mut config = match (config_path, source_dir.clone()) {
        (Some(path), _) => ConfigFile::from_path(&path)?,
        (None, Some(dir)) => ConfigFile::new(dir, Vec::new()),
        (None, None) => {
            return Err(SheetMetricsError::Config(
                "either --config or --source-dir is required".to_string(),
            ))
        }
    };
    if let Some(dir) = source_dir {
        config.source_dir = dir;
    }
    if !entities.is_empty() {
        config.entities = entities;
    }
    if !metrics.is_empty() {
        config.metrics = metrics;
    }
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }

    let pipeline = config.to_builder().build()?;
    let outcome = pipeline.run()?;

    for path in emit_reports(&outcome.summary, &config.output)? {
        info!("Report written: {}", path.display());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    render_summary_table(&outcome.summary, &mut handle)?;
    writeln!(
        handle,
        "\n{} files processed, {} skipped, {} department/metric pairs without data",
        outcome.processed_files.len(),
        outcome.skipped_files.len(),
        outcome.summary.missing_pairs().len()
    )?;
    for skipped in &outcome.skipped_files {
        writeln!(handle, "  skipped {}: {}", skipped.file, skipped.reason)?;
    }
    handle.flush()?;

    Ok(())
}

fn convert_xls(dir: PathBuf, keep_source: bool) -> Result<(), SheetMetricsError> {
    let report = convert_directory(&dir, !keep_source)?;
    println!(
        "Converted {} files, {} failed",
        report.converted.len(),
        report.failed.len()
    );
    for (source, reason) in &report.failed {
        warn!("{}: {}", source.display(), reason);
    }
    Ok(())
}

fn json_to_xlsx(
    report: PathBuf,
    output: Option<PathBuf>,
    per_entity: bool,
    title_prefix: &str,
) -> Result<(), SheetMetricsError> {
    let document = ReportDocument::from_path(&report)?;
    let output = output.unwrap_or_else(|| report.with_extension("xlsx"));

    if per_entity {
        write_entity_sheets(&document, title_prefix, &output)?;
    } else {
        write_flat_table(&document, &output)?;
    }
    println!("Conversion completed: {} -> {}", report.display(), output.display());
    Ok(())
}

fn handle_error(error: SheetMetricsError) {
    match error {
        SheetMetricsError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the path exists and you have permission to access it.");
        }
        SheetMetricsError::Parse(parse_err) => {
            eprintln!("Parse Error: {}", parse_err);
            eprintln!("The file may not be a valid Excel file or may be corrupted.");
        }
        SheetMetricsError::Json(json_err) => {
            eprintln!("JSON Error: {}", json_err);
            eprintln!("Please check the config or report file syntax.");
        }
        SheetMetricsError::Write(write_err) => {
            eprintln!("Write Error: {}", write_err);
        }
        SheetMetricsError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
            eprintln!("Please check the department list, metrics and layout settings.");
        }
        other => {
            eprintln!("Error: {}", other);
        }
    }
}
