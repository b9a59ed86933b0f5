//! sheetmetrics - Per-department metric aggregation over monthly Excel reports
//!
//! This crate reads a directory of monthly workbooks that share a layout (a merged
//! label row, then one data row per department), extracts selected metrics for
//! selected departments, and aggregates them into per-period series with
//! mean/count/sum statistics. The result is written as JSON reports (full, simple,
//! and no-data) and optionally as spreadsheets.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sheetmetrics::{emit_reports, OutputConfig, PipelineBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = PipelineBuilder::new("reports/2024")
//!         .with_entities(["外科", "内科"])
//!         .with_metric("出院人次")
//!         .with_metric("门诊人次")
//!         .build()?;
//!
//!     let outcome = pipeline.run()?;
//!     for skipped in &outcome.skipped_files {
//!         eprintln!("skipped {}: {}", skipped.file, skipped.reason);
//!     }
//!
//!     emit_reports(&outcome.summary, &OutputConfig::default())?;
//!     Ok(())
//! }
//! ```
//!
//! # Column Offsets
//!
//! The value for a metric is read `offset` columns to the right of its label.
//! The offset depends on the report period and is configured as data:
//!
//! ```rust
//! use sheetmetrics::{LayoutRule, LayoutVariant, PipelineBuilder, VariantMatch};
//!
//! let rule = LayoutRule {
//!     default_offset: 3,
//!     variants: vec![LayoutVariant {
//!         name: "year-end".to_string(),
//!         matcher: VariantMatch::FilenameContains(vec!["12月".to_string()]),
//!         offset: 0,
//!     }],
//! };
//! assert_eq!(rule.offset_for("2024年12月.xlsx", None), 0);
//! assert_eq!(rule.offset_for("2024年3月.xlsx", None), 3);
//!
//! let builder = PipelineBuilder::new("reports").with_layout_rule(rule);
//! ```
//!
//! # Configuration File
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sheetmetrics::{emit_reports, ConfigFile};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigFile::from_path(Path::new("sheetmetrics.json"))?;
//!     let outcome = config.to_builder().build()?.run()?;
//!     emit_reports(&outcome.summary, &config.output)?;
//!     Ok(())
//! }
//! ```

mod aggregate;
mod api;
mod builder;
mod config;
mod convert;
mod error;
mod extract;
mod grid;
mod header;
mod parser;
mod period;
mod report;
mod types;

// 公開API
pub use aggregate::{
    round_to, Aggregator, EntitySummary, MetricSummary, Observation, Statistics, Summary,
};
pub use api::{MetricSelection, SheetSelector};
pub use builder::{EntityMiss, MetricMiss, Pipeline, PipelineBuilder, RunOutcome, SkippedFile};
pub use config::{emit_reports, ConfigFile, OutputConfig};
pub use convert::{convert_directory, convert_file, write_workbook, ConversionReport};
pub use error::{Result, SheetMetricsError};
pub use extract::{
    ExtractOutcome, FixedColumn, LayoutRule, LayoutVariant, MetricExtractor, MissingPolicy,
    SheetLayout, ValueLabel, VariantMatch,
};
pub use grid::SheetGrid;
pub use header::{resolve_header, ResolvedHeader};
pub use parser::{WorkbookReader, MAX_INPUT_FILE_SIZE};
pub use period::{Period, PeriodGranularity};
pub use report::{
    build_entity_sheets, build_flat_table, render_summary_table, sanitize_sheet_name,
    write_entity_sheets, write_flat_table, write_json, write_json_file, FullReport,
    LoadedMetric, MetricEntry, NoDataEntry, NoDataReport, OrderedMap, ReportDocument,
    ReportShape, SimpleEntry, SimpleReport,
};
pub use types::{coerce, CellValue, CoercedValue};
