//! Boundary Tests for sheetmetrics
//!
//! Edge cases of the pipeline: placeholder values, layout options, sheet
//! selection, and files that cannot be processed.

use std::path::Path;

use rust_xlsxwriter::*;
use sheetmetrics::{
    ExtractOutcome, LayoutRule, MetricSelection, MissingPolicy, PeriodGranularity, PipelineBuilder, ReportShape,
    SheetLayout, SheetSelector, ValueLabel,
};

// Helper module for generating boundary test fixtures
mod fixtures {
    use super::*;

    pub enum Cell<'a> {
        S(&'a str),
        N(f64),
        E,
    }

    /// Generate a workbook whose first sheet holds `rows` starting at A1
    pub fn write_rows(
        dir: &Path,
        file_name: &str,
        sheet_name: &str,
        rows: &[Vec<Cell>],
    ) -> Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Cell::S(s) => {
                        worksheet.write_string(r as u32, c as u16, *s)?;
                    }
                    Cell::N(n) => {
                        worksheet.write_number(r as u32, c as u16, *n)?;
                    }
                    Cell::E => {}
                }
            }
        }
        workbook.save(dir.join(file_name))?;
        Ok(())
    }

    /// Standard layout with one metric "M" at column 1 and its value at `value_col`
    pub fn standard(value: Cell<'static>, value_col: usize) -> Vec<Vec<Cell<'static>>> {
        let label_row = vec![Cell::S("科室名称"), Cell::S("M"), Cell::E, Cell::E];
        let mut sub_row = vec![Cell::E, Cell::E, Cell::E, Cell::E];
        sub_row[value_col] = Cell::S("工作量");
        let mut data_row = vec![Cell::S("外科"), Cell::N(-1.0), Cell::N(-1.0), Cell::N(-1.0)];
        data_row[value_col] = value;
        vec![
            vec![Cell::S("title")],
            vec![],
            vec![],
            label_row,
            sub_row,
            data_row,
        ]
    }
}

use fixtures::Cell;

fn run_single(dir: &Path, builder: PipelineBuilder) -> sheetmetrics::RunOutcome {
    builder
        .with_source_dir(dir)
        .with_entity("外科")
        .with_metric("M")
        .build()
        .unwrap()
        .run()
        .unwrap()
}

#[test]
fn test_placeholder_is_skipped_by_default() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &fixtures::standard(Cell::S("--"), 3))
        .unwrap();

    let outcome = run_single(dir.path(), PipelineBuilder::new("."));
    assert!(outcome.summary.entities[0].metrics[0].statistics.is_none());
    assert!(outcome.metric_misses.is_empty());
}

#[test]
fn test_placeholder_as_zero() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &fixtures::standard(Cell::S("--"), 3))
        .unwrap();
    fixtures::write_rows(dir.path(), "2024年4月.xlsx", "Sheet1", &fixtures::standard(Cell::S(" 8 "), 3))
        .unwrap();

    let outcome = run_single(
        dir.path(),
        PipelineBuilder::new(".").with_missing_policy(MissingPolicy::Zero),
    );
    let stats = outcome.summary.entities[0].metrics[0].statistics.unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.sum, 8.0);
    assert_eq!(stats.mean, 4.0);
}

#[test]
fn test_text_value_is_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &fixtures::standard(Cell::S("暂无"), 3))
        .unwrap();

    let outcome = run_single(dir.path(), PipelineBuilder::new("."));
    assert_eq!(outcome.summary.missing_pairs(), vec![("外科", "M")]);
}

#[test]
fn test_offset_beyond_header_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &fixtures::standard(Cell::N(5.0), 3))
        .unwrap();

    let outcome = run_single(
        dir.path(),
        PipelineBuilder::new(".").with_layout_rule(LayoutRule::fixed(9)),
    );
    assert_eq!(outcome.metric_misses.len(), 1);
    assert_eq!(
        outcome.metric_misses[0].outcome,
        ExtractOutcome::OutOfRange { column: 10 }
    );
}

#[test]
fn test_value_label_check() {
    let dir = tempfile::tempdir().unwrap();
    // Value sits at +1 while the rule says +2
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &fixtures::standard(Cell::N(5.0), 2))
        .unwrap();

    let layout = SheetLayout {
        value_label: Some(ValueLabel {
            row: 4,
            label: "工作量".to_string(),
        }),
        ..SheetLayout::default()
    };
    let outcome = run_single(dir.path(), PipelineBuilder::new(".").with_layout(layout.clone()));
    assert!(matches!(
        outcome.metric_misses[0].outcome,
        ExtractOutcome::ValueLabelMismatch { column: 3, .. }
    ));

    let outcome = run_single(
        dir.path(),
        PipelineBuilder::new(".")
            .with_layout(layout)
            .with_layout_rule(LayoutRule::fixed(1)),
    );
    let stats = outcome.summary.entities[0].metrics[0].statistics.unwrap();
    assert_eq!(stats.sum, 5.0);
}

#[test]
fn test_drop_columns_before_header() {
    let dir = tempfile::tempdir().unwrap();
    // An extra column B shifts everything one column to the right
    let rows = vec![
        vec![],
        vec![],
        vec![],
        vec![Cell::S("科室名称"), Cell::S("序号"), Cell::S("M"), Cell::E, Cell::E],
        vec![],
        vec![Cell::S("外科"), Cell::N(1.0), Cell::N(-1.0), Cell::N(-1.0), Cell::N(6.0)],
    ];
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &rows).unwrap();

    let layout = SheetLayout {
        drop_columns: vec![1],
        ..SheetLayout::default()
    };
    let outcome = run_single(dir.path(), PipelineBuilder::new(".").with_layout(layout));
    let stats = outcome.summary.entities[0].metrics[0].statistics.unwrap();
    assert_eq!(stats.sum, 6.0);
}

#[test]
fn test_empty_label_row_skips_file() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![
        vec![Cell::S("title")],
        vec![],
        vec![],
        vec![],
        vec![],
        vec![Cell::S("外科"), Cell::N(1.0)],
    ];
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &rows).unwrap();

    let outcome = run_single(dir.path(), PipelineBuilder::new("."));
    assert!(outcome.processed_files.is_empty());
    assert_eq!(outcome.skipped_files.len(), 1);
    assert!(outcome.skipped_files[0].reason.contains("Label row 3 is empty"));
}

#[test]
fn test_short_sheet_skips_file() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &[vec![Cell::S("title")]]).unwrap();

    let outcome = run_single(dir.path(), PipelineBuilder::new("."));
    assert_eq!(outcome.skipped_files.len(), 1);
}

#[test]
fn test_sheet_selection_by_name() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "汇总", &fixtures::standard(Cell::N(5.0), 3))
        .unwrap();

    let outcome = run_single(
        dir.path(),
        PipelineBuilder::new(".").with_sheet_selector(SheetSelector::Name("汇总".to_string())),
    );
    assert_eq!(outcome.processed_files.len(), 1);

    let outcome = run_single(
        dir.path(),
        PipelineBuilder::new(".").with_sheet_selector(SheetSelector::Name("明细".to_string())),
    );
    assert!(outcome.processed_files.is_empty());
    assert!(outcome.skipped_files[0].reason.contains("明细"));
}

#[test]
fn test_year_month_granularity_keeps_years_apart() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_rows(dir.path(), "2023年3月.xlsx", "Sheet1", &fixtures::standard(Cell::N(1.0), 3))
        .unwrap();
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &fixtures::standard(Cell::N(2.0), 3))
        .unwrap();

    let month_only = run_single(dir.path(), PipelineBuilder::new("."));
    let stats = month_only.summary.entities[0].metrics[0].statistics.unwrap();
    // Same month in two years collapses to one key; the later file wins
    assert_eq!(stats.count, 1);
    assert_eq!(stats.sum, 2.0);

    let year_month = run_single(
        dir.path(),
        PipelineBuilder::new(".").with_granularity(PeriodGranularity::YearMonth),
    );
    let json = year_month.summary.to_json_string(ReportShape::Full).unwrap();
    assert!(json.contains("\"2023年03月\": 1.0"));
    assert!(json.contains("\"2024年03月\": 2.0"));
}

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_single(dir.path(), PipelineBuilder::new("."));
    assert!(outcome.processed_files.is_empty());
    assert_eq!(outcome.summary.missing_pairs(), vec![("外科", "M")]);
}

#[test]
fn test_extension_filter() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &fixtures::standard(Cell::N(5.0), 3))
        .unwrap();

    let outcome = run_single(dir.path(), PipelineBuilder::new(".").with_extensions(["xls"]));
    assert!(outcome.processed_files.is_empty());
    assert!(outcome.skipped_files.is_empty());
}

#[test]
fn test_infer_all_with_merged_entity_header() {
    let dir = tempfile::tempdir().unwrap();
    // 科室名称 is merged across columns A:B
    let rows = vec![
        vec![Cell::S("title")],
        vec![],
        vec![],
        vec![Cell::S("科室名称"), Cell::E, Cell::S("出院人次"), Cell::E, Cell::E],
        vec![],
        vec![Cell::S("外科"), Cell::N(-1.0), Cell::N(-1.0), Cell::N(-1.0), Cell::N(7.0)],
    ];
    fixtures::write_rows(dir.path(), "2024年3月.xlsx", "Sheet1", &rows).unwrap();

    let outcome = PipelineBuilder::new(dir.path())
        .with_entity("外科")
        .with_metrics(MetricSelection::InferAll)
        .build()
        .unwrap()
        .run()
        .unwrap();

    let metrics: Vec<&str> = outcome.summary.entities[0]
        .metrics
        .iter()
        .map(|m| m.metric.as_str())
        .collect();
    assert_eq!(metrics, vec!["出院人次"]);
    assert!(outcome.metric_misses.is_empty());
    let stats = outcome.summary.entities[0].metrics[0].statistics.unwrap();
    assert_eq!(stats.sum, 7.0);
}
