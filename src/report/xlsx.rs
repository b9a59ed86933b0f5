//! スプレッドシート形式のレポート出力
//!
//! 読み込んだレポート（`ReportDocument`）を2種類のレイアウトでxlsxへ書き出します。
//!
//! - 一覧表: 1行 = 1（科室, 指標）。期間列は初出順に右へ追加
//! - 科室別シート: 科室ごとに1シート。タイトル行 + 月別（1月〜12月）の表

use std::collections::HashSet;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{debug, info};

use crate::error::Result;
use crate::period::Period;
use crate::report::{LoadedMetric, ReportDocument};

/// シート名の最大長（文字数）
const SHEET_NAME_MAX_LEN: usize = 31;

/// シート名に使用できない文字
const SHEET_NAME_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// 一覧表の固定列
const FLAT_COLUMNS: [&str; 5] = ["科室", "指标", "平均值", "数据月份数", "总值"];

/// Excelのシート名規則に合わせて名前を整える
///
/// 使用できない文字を`_`に置き換え、前後の空白とアポストロフィを除去し、
/// 31文字に切り詰めます。結果が空になる場合は`"Sheet"`を返します。
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if SHEET_NAME_ILLEGAL.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = trim_sheet_name(&replaced);
    if trimmed.is_empty() {
        return "Sheet".to_string();
    }
    let truncated: String = trimmed.chars().take(SHEET_NAME_MAX_LEN).collect();
    trim_sheet_name(&truncated).to_string()
}

fn trim_sheet_name(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || c == '\'')
}

/// 重複しないシート名を割り当てる
///
/// Excelはシート名の大文字・小文字を区別しないため、`used`には小文字化した名前を記録します。
pub(crate) fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    if used.insert(base.to_lowercase()) {
        return base;
    }

    let stem: String = base.chars().take(SHEET_NAME_MAX_LEN - 3).collect();
    let mut index = 2usize;
    loop {
        let candidate: String = format!("{stem}__{index}")
            .chars()
            .take(SHEET_NAME_MAX_LEN)
            .collect();
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        index += 1;
    }
}

fn write_optional_number(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
) -> Result<()> {
    if let Some(value) = value {
        worksheet.write_number(row, col, value)?;
    }
    Ok(())
}

/// 一覧表のワークブックを構築する
pub fn build_flat_table(document: &ReportDocument) -> Result<Workbook> {
    // 期間列は全指標を通じた初出順
    let mut period_columns: Vec<&str> = Vec::new();
    for metrics in document.entities.values() {
        for metric in metrics.values() {
            if let Some(monthly) = metric.monthly_data() {
                for key in monthly.keys() {
                    if !period_columns.contains(&key) {
                        period_columns.push(key);
                    }
                }
            }
        }
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    let headers = FLAT_COLUMNS.iter().copied().chain(period_columns.iter().copied());
    for (col, header) in headers.enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    let mut row = 1u32;
    for (entity, metrics) in document.entities.iter() {
        for (name, metric) in metrics.iter() {
            worksheet.write_string(row, 0, entity)?;
            worksheet.write_string(row, 1, name)?;

            let mean_and_count = metric.mean_and_count();
            write_optional_number(worksheet, row, 2, mean_and_count.map(|(mean, _)| mean))?;
            write_optional_number(worksheet, row, 3, mean_and_count.map(|(_, n)| n as f64))?;
            write_optional_number(worksheet, row, 4, metric.sum())?;

            if let Some(monthly) = metric.monthly_data() {
                for (idx, period) in period_columns.iter().enumerate() {
                    let col = (FLAT_COLUMNS.len() + idx) as u16;
                    write_optional_number(worksheet, row, col, monthly.get(period).copied())?;
                }
            }
            row += 1;
        }
    }

    Ok(workbook)
}

/// 月番号（1〜12）に対応する値を期間別データから探す
///
/// キーは`Period::parse_label`が受け付ける形式（`"01月"`、`"2024年01月"`など）です。
fn month_value(metric: &LoadedMetric, month: u32) -> Option<f64> {
    metric.monthly_data().and_then(|monthly| {
        monthly
            .iter()
            .find(|(key, _)| Period::parse_label(key).is_ok_and(|p| p.month() == month))
            .map(|(_, value)| *value)
    })
}

/// 科室別シートのワークブックを構築する
///
/// 期間別データを1件以上持つ指標のみを出力し、該当する指標がない科室は
/// シートを作成しません。
///
/// # 引数
///
/// * `document` - 完全版レポート
/// * `title_prefix` - タイトル行の接頭辞（例: `"2024年"`）
pub fn build_entity_sheets(document: &ReportDocument, title_prefix: &str) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let title_format = Format::new().set_bold().set_font_size(14);
    let header_format = Format::new().set_bold();
    let mut used_names = HashSet::new();

    let mut headers: Vec<String> = vec!["序号".to_string(), "考核指标".to_string(), "目标值".to_string()];
    headers.extend((1..=12).map(|m| format!("{m}月")));
    headers.push("全年均值".to_string());

    for (entity, metrics) in document.entities.iter() {
        let rows: Vec<(&str, &LoadedMetric)> = metrics
            .iter()
            .filter(|(_, metric)| metric.monthly_data().is_some_and(|m| !m.is_empty()))
            .collect();
        if rows.is_empty() {
            debug!("{}: no metric data, sheet skipped", entity);
            continue;
        }

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(unique_sheet_name(entity, &mut used_names))?;
        worksheet.write_string_with_format(
            0,
            0,
            format!("{title_prefix}{entity}指标统计表"),
            &title_format,
        )?;
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string_with_format(1, col as u16, header, &header_format)?;
        }

        for (idx, (name, metric)) in rows.iter().enumerate() {
            let row = (idx + 2) as u32;
            worksheet.write_number(row, 0, (idx + 1) as f64)?;
            worksheet.write_string(row, 1, *name)?;
            for month in 1..=12u32 {
                write_optional_number(worksheet, row, (month + 2) as u16, month_value(metric, month))?;
            }
            write_optional_number(
                worksheet,
                row,
                15,
                metric.mean_and_count().map(|(mean, _)| mean),
            )?;
        }
        worksheet.set_column_width(1, 24)?;
    }

    Ok(workbook)
}

/// 一覧表をファイルへ書き出す
pub fn write_flat_table(document: &ReportDocument, path: &Path) -> Result<()> {
    let mut workbook = build_flat_table(document)?;
    workbook.save(path)?;
    info!("Wrote xlsx report {}", path.display());
    Ok(())
}

/// 科室別シートをファイルへ書き出す
pub fn write_entity_sheets(document: &ReportDocument, title_prefix: &str, path: &Path) -> Result<()> {
    let mut workbook = build_entity_sheets(document, title_prefix)?;
    workbook.save(path)?;
    info!("Wrote per-department xlsx report {}", path.display());
    Ok(())
}
