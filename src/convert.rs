//! Convert Module
//!
//! 旧形式（.xls）のワークブックを.xlsxへ一括変換するモジュール。
//! すべてのシートのセル値を保持し、日付セルは日付書式付きのシリアル値として書き出します。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook};
use tracing::{info, warn};

use crate::error::{Result, SheetMetricsError};
use crate::grid::SheetGrid;
use crate::parser::WorkbookReader;
use crate::report::unique_sheet_name;
use crate::types::CellValue;

/// 一括変換の結果
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// 変換に成功した（変換元, 変換先）
    pub converted: Vec<(PathBuf, PathBuf)>,

    /// 変換に失敗した（変換元, エラー内容）
    pub failed: Vec<(PathBuf, String)>,
}

/// シートのグリッドを.xlsxとして書き出す
pub fn write_workbook(sheets: &[(String, SheetGrid)], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let mut used_names = HashSet::new();

    for (name, grid) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(unique_sheet_name(name, &mut used_names))?;

        for row_idx in 0..grid.rows() {
            let Some(row) = grid.row(row_idx) else {
                continue;
            };
            let row_num = u32::try_from(row_idx).map_err(|_| {
                SheetMetricsError::Config(format!("row {} exceeds xlsx limits", row_idx))
            })?;
            for (col_idx, cell) in row.iter().enumerate() {
                let col_num = u16::try_from(col_idx).map_err(|_| {
                    SheetMetricsError::Config(format!("column {} exceeds xlsx limits", col_idx))
                })?;
                match cell {
                    CellValue::Number(n) => {
                        worksheet.write_number(row_num, col_num, *n)?;
                    }
                    CellValue::DateTime(serial) => {
                        worksheet.write_number_with_format(row_num, col_num, *serial, &date_format)?;
                    }
                    CellValue::String(s) | CellValue::Error(s) => {
                        worksheet.write_string(row_num, col_num, s)?;
                    }
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(row_num, col_num, *b)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// 1ファイルを変換し、変換先のパスを返す
///
/// 変換先は同じディレクトリの同名`.xlsx`ファイルです（既存ファイルは上書き）。
/// `remove_source`が`true`の場合、書き込みに成功した後に変換元を削除します。
pub fn convert_file(source: &Path, remove_source: bool) -> Result<PathBuf> {
    let target = source.with_extension("xlsx");

    let mut reader = WorkbookReader::open(source)?;
    let sheets = reader.sheet_grids()?;
    write_workbook(&sheets, &target)?;
    info!("Converted {} -> {}", source.display(), target.display());

    if remove_source {
        std::fs::remove_file(source)?;
        info!("Removed {}", source.display());
    }
    Ok(target)
}

/// ディレクトリ内のすべての.xlsファイルを変換する
///
/// ファイル単位の失敗は`ConversionReport::failed`に記録され、処理は継続します。
/// ディレクトリ自体を読み込めない場合のみエラーを返します。
pub fn convert_directory(dir: &Path, remove_source: bool) -> Result<ConversionReport> {
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_xls = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xls"));
        if is_xls && path.is_file() {
            sources.push(path);
        }
    }
    sources.sort();

    let mut report = ConversionReport::default();
    for source in sources {
        match convert_file(&source, remove_source) {
            Ok(target) => report.converted.push((source, target)),
            Err(e) => {
                warn!("Failed to convert {}: {}", source.display(), e);
                report.failed.push((source, e.to_string()));
            }
        }
    }
    Ok(report)
}
