//! Header Module
//!
//! 横方向に結合された見出しセルを含む見出し行から、
//! 列ごとのラベル列を再構成するモジュール（Header Resolver）。
//!
//! 結合セルは左端のセルにのみ値を持つため、空セルは左側で最も近い
//! 非空セルのラベルを引き継ぎます（前方補完）。

use crate::error::{Result, SheetMetricsError};
use crate::types::CellValue;

/// 列ごとに解決された見出しラベル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeader {
    labels: Vec<Option<String>>,
    /// 先頭列の結合範囲（先頭列から次の非空セルの手前まで）
    entity_span: usize,
}

impl ResolvedHeader {
    /// 列数
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// 指定列のラベル
    pub fn label(&self, col: usize) -> Option<&str> {
        self.labels.get(col).and_then(|l| l.as_deref())
    }

    /// すべての列のラベル
    pub fn labels(&self) -> &[Option<String>] {
        &self.labels
    }

    /// ラベルを持つ最初の列のインデックス
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .position(|l| l.as_deref() == Some(label))
    }

    /// 先頭列が結合されている列数
    pub fn entity_span(&self) -> usize {
        self.entity_span
    }

    /// 科室列（結合範囲を含む）を除く重複のないラベルを列順に返す
    pub fn metric_labels(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for label in self.labels.iter().skip(self.entity_span).flatten() {
            if !result.contains(label) {
                result.push(label.clone());
            }
        }
        result
    }
}

/// 見出し行を前方補完して列ラベルを解決する
///
/// # 引数
///
/// * `row` - 見出し行のセル
/// * `row_index` - 見出し行のインデックス（エラー報告用）
/// * `entity_label` - 先頭列に必ず設定されるラベル（例: `"科室"`）
///
/// # 戻り値
///
/// * `Ok(ResolvedHeader)` - 入力と同じ長さのラベル列
/// * `Err(SheetMetricsError::EmptyHeader)` - 行が空、またはラベルを1つも含まない場合
///
/// # 例
///
/// ```rust
/// use sheetmetrics::{resolve_header, CellValue};
///
/// let row = vec![
///     CellValue::String("A".to_string()),
///     CellValue::Empty,
///     CellValue::Empty,
///     CellValue::String("B".to_string()),
///     CellValue::Empty,
/// ];
/// let header = resolve_header(&row, 3, "科室").unwrap();
/// assert_eq!(header.label(0), Some("科室"));
/// assert_eq!(header.label(2), Some("A"));
/// assert_eq!(header.label(4), Some("B"));
/// ```
pub fn resolve_header(
    row: &[CellValue],
    row_index: usize,
    entity_label: &str,
) -> Result<ResolvedHeader> {
    if row.iter().all(|cell| cell.as_label().is_none()) {
        return Err(SheetMetricsError::EmptyHeader { row: row_index });
    }

    let mut current: Option<String> = None;
    let mut labels: Vec<Option<String>> = row
        .iter()
        .map(|cell| {
            if let Some(label) = cell.as_label() {
                current = Some(label);
            }
            current.clone()
        })
        .collect();

    if let Some(first) = labels.first_mut() {
        *first = Some(entity_label.to_string());
    }

    let entity_span = row
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, cell)| cell.as_label().is_some())
        .map(|(idx, _)| idx)
        .unwrap_or(row.len());

    Ok(ResolvedHeader {
        labels,
        entity_span,
    })
}
