//! コンソール向けMarkdownテーブル
//!
//! 集計結果を（科室, 指標）ごとの1行にまとめたMarkdownテーブルとして出力します。
//! 列幅は表示幅で計算します（全角文字は2、半角文字は1）。

use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::aggregate::Summary;
use crate::error::Result;

const HEADERS: [&str; 5] = ["科室", "指标", "平均值", "数据月份数", "总值"];

/// Markdown特殊文字のエスケープ
fn escape_markdown(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace('\n', "<br>")
}

/// 集計結果をテーブルの行に変換する（データのない指標は`-`）
fn summary_rows(summary: &Summary) -> Vec<Vec<String>> {
    let mut rows = vec![HEADERS.iter().map(|h| h.to_string()).collect()];
    for entity in &summary.entities {
        for metric in &entity.metrics {
            let (mean, count, sum) = match metric.statistics {
                Some(stats) => (
                    stats.mean.to_string(),
                    stats.count.to_string(),
                    stats.sum.to_string(),
                ),
                None => ("-".to_string(), "0".to_string(), "-".to_string()),
            };
            rows.push(vec![
                escape_markdown(&entity.entity),
                escape_markdown(&metric.metric),
                mean,
                count,
                sum,
            ]);
        }
    }
    rows
}

/// 列幅を計算する（最小幅は区切り行に合わせて3）
fn calculate_column_widths(rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = vec![3; HEADERS.len()];
    for row in rows {
        for (col_idx, cell) in row.iter().enumerate() {
            widths[col_idx] = widths[col_idx].max(cell.trim().width());
        }
    }
    widths
}

fn generate_separator(col_widths: &[usize]) -> String {
    let mut separator = String::from("|");
    for &width in col_widths {
        separator.push_str(&"-".repeat(width + 2));
        separator.push('|');
    }
    separator
}

/// 集計結果をMarkdownテーブルとして出力する
///
/// # 使用例
///
/// ```rust
/// use sheetmetrics::{render_summary_table, Aggregator};
///
/// let summary = Aggregator::new(["外科"], ["出院人次"]).summarize(4);
/// let mut out = Vec::new();
/// render_summary_table(&summary, &mut out).unwrap();
/// assert!(String::from_utf8(out).unwrap().starts_with("| 科室"));
/// ```
pub fn render_summary_table<W: Write>(summary: &Summary, writer: &mut W) -> Result<()> {
    let rows = summary_rows(summary);
    let col_widths = calculate_column_widths(&rows);
    let separator = generate_separator(&col_widths);

    for (row_idx, row) in rows.iter().enumerate() {
        write!(writer, "|")?;
        for (cell, &width) in row.iter().zip(&col_widths) {
            let content = cell.trim();
            let padding = width.saturating_sub(content.width());
            write!(writer, " {}{} |", content, " ".repeat(padding))?;
        }
        writeln!(writer)?;

        if row_idx == 0 {
            writeln!(writer, "{}", separator)?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregator, Observation};
    use crate::period::Period;

    fn render(summary: &Summary) -> String {
        let mut out = Vec::new();
        render_summary_table(summary, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cjk_width_alignment() {
        let mut aggregator = Aggregator::new(["外科"], ["出院人次", "门诊人次"]);
        aggregator.record(Observation {
            entity: "外科".to_string(),
            metric: "出院人次".to_string(),
            period: Period::month_only(1).unwrap(),
            value: 10.0,
        });
        let text = render(&aggregator.summarize(4));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| 科室 | 指标     | 平均值 | 数据月份数 | 总值 |");
        assert_eq!(lines[1], "|------|----------|--------|------------|------|");
        assert_eq!(lines[2], "| 外科 | 出院人次 | 10     | 1          | 10   |");
        assert_eq!(lines[3], "| 外科 | 门诊人次 | -      | 0          | -    |");

        // すべての行の表示幅が揃う
        let width = lines[0].width();
        assert!(lines.iter().all(|line| line.width() == width));
    }

    #[test]
    fn test_pipe_is_escaped() {
        let summary = Aggregator::new(["A|B"], ["x"]).summarize(4);
        assert!(render(&summary).contains("A\\|B"));
    }
}
