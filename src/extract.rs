//! Extract Module
//!
//! 解決済みの見出しとレイアウト規則から、指標値が格納された列を特定して
//! 値を読み取るモジュール（Metric Extractor）。
//!
//! 月次レポートの見出しは「前年同月／当月／増減」のような固定幅の列グループに
//! 結合されており、「当月値」がどの列にあるかはレポート期間によって変わります。
//! どの規則を適用するかはファイル名（または期間）から判定します。

use serde::{Deserialize, Serialize};

use crate::grid::SheetGrid;
use crate::header::ResolvedHeader;
use crate::period::Period;
use crate::types::{coerce, CoercedValue};

/// レイアウト規則の判定条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantMatch {
    /// ファイル名がいずれかの文字列を含む
    FilenameContains(Vec<String>),

    /// 期間の月がいずれかに一致する
    Months(Vec<u32>),
}

impl VariantMatch {
    fn matches(&self, file_name: &str, period: Option<Period>) -> bool {
        match self {
            VariantMatch::FilenameContains(tokens) => {
                tokens.iter().any(|token| file_name.contains(token.as_str()))
            }
            VariantMatch::Months(months) => {
                period.is_some_and(|p| months.contains(&p.month()))
            }
        }
    }
}

/// 列オフセットの規則の1バリアント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutVariant {
    /// ログ出力用の名前（例: `"year-end"`）
    pub name: String,

    /// 判定条件
    #[serde(rename = "match")]
    pub matcher: VariantMatch,

    /// 見出し列に加算する列数
    pub offset: usize,
}

/// ファイルごとの列オフセットを決定する規則
///
/// 最初に一致したバリアントのオフセットを使用し、どれにも一致しない場合は
/// `default_offset`を使用します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutRule {
    pub default_offset: usize,
    pub variants: Vec<LayoutVariant>,
}

impl Default for LayoutRule {
    /// 「ファイル名に`11月`または`12月`を含む場合は+0、それ以外は+2」
    fn default() -> Self {
        Self {
            default_offset: 2,
            variants: vec![LayoutVariant {
                name: "year-end".to_string(),
                matcher: VariantMatch::FilenameContains(vec![
                    "11月".to_string(),
                    "12月".to_string(),
                ]),
                offset: 0,
            }],
        }
    }
}

impl LayoutRule {
    /// 固定オフセットの規則を生成する
    pub fn fixed(offset: usize) -> Self {
        Self {
            default_offset: offset,
            variants: Vec::new(),
        }
    }

    /// 一致したバリアントを返す（`None`はデフォルト）
    pub fn variant_for(&self, file_name: &str, period: Option<Period>) -> Option<&LayoutVariant> {
        self.variants
            .iter()
            .find(|v| v.matcher.matches(file_name, period))
    }

    /// ファイルに適用する列オフセット
    pub fn offset_for(&self, file_name: &str, period: Option<Period>) -> usize {
        self.variant_for(file_name, period)
            .map_or(self.default_offset, |v| v.offset)
    }
}

/// 見出しの検索を行わず、固定列から読み取る指標
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedColumn {
    pub label: String,
    pub column: usize,
}

/// 値列の副見出し確認
///
/// 設定されている場合、値を読み取る列の`row`行目が`label`（前後空白除去）で
/// なければなりません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueLabel {
    pub row: usize,
    pub label: String,
}

/// ワークシートのレイアウト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// 見出し行（0始まり）
    pub label_row: usize,

    /// 最初のデータ行（0始まり）
    pub data_start_row: usize,

    /// 先頭列に設定するラベル
    pub entity_label: String,

    /// 見出し解決の前に削除する列
    pub drop_columns: Vec<usize>,

    /// 固定列から読み取る指標
    pub fixed_columns: Vec<FixedColumn>,

    /// 値列の副見出し確認
    pub value_label: Option<ValueLabel>,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            label_row: 3,
            data_start_row: 5,
            entity_label: "科室".to_string(),
            drop_columns: Vec::new(),
            fixed_columns: Vec::new(),
            value_label: None,
        }
    }
}

/// 欠損値・解釈不能値の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// 観測値を記録しない（デフォルト）
    #[default]
    Skip,

    /// 0として記録する
    Zero,
}

/// 1指標の抽出結果
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    /// 数値を取得できた
    Value(f64),

    /// セルが空、またはプレースホルダー
    Missing,

    /// セルの値を数値として解釈できない
    Unparseable(String),

    /// 見出しに指標ラベルが存在しない
    LabelNotFound,

    /// オフセット適用後の列が見出しの範囲外
    OutOfRange { column: usize },

    /// 値列の副見出しが一致しない
    ValueLabelMismatch { column: usize, found: String },
}

impl ExtractOutcome {
    /// 欠損値ポリシーを適用して、記録すべき値を返す
    ///
    /// 見出しや列が見つからない場合は常に`None`です。
    pub fn resolve(&self, policy: MissingPolicy) -> Option<f64> {
        match (self, policy) {
            (ExtractOutcome::Value(v), _) => Some(*v),
            (ExtractOutcome::Missing | ExtractOutcome::Unparseable(_), MissingPolicy::Zero) => {
                Some(0.0)
            }
            _ => None,
        }
    }

    /// 指標自体が見つからなかった（セルの値の問題ではない）かどうか
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExtractOutcome::LabelNotFound
                | ExtractOutcome::OutOfRange { .. }
                | ExtractOutcome::ValueLabelMismatch { .. }
        )
    }
}

/// 1ファイル分の指標抽出器
pub struct MetricExtractor<'a> {
    header: &'a ResolvedHeader,
    layout: &'a SheetLayout,
    offset: usize,
}

impl<'a> MetricExtractor<'a> {
    pub fn new(header: &'a ResolvedHeader, layout: &'a SheetLayout, offset: usize) -> Self {
        Self {
            header,
            layout,
            offset,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 指標の値が格納された列を求める
    pub fn value_column(&self, metric: &str) -> Result<usize, ExtractOutcome> {
        if let Some(fixed) = self.layout.fixed_columns.iter().find(|f| f.label == metric) {
            return Ok(fixed.column);
        }

        let column = self
            .header
            .position(metric)
            .ok_or(ExtractOutcome::LabelNotFound)?
            + self.offset;
        if column >= self.header.len() {
            return Err(ExtractOutcome::OutOfRange { column });
        }
        Ok(column)
    }

    /// 指定行から指標の値を読み取る
    pub fn extract(&self, grid: &SheetGrid, row: usize, metric: &str) -> ExtractOutcome {
        let column = match self.value_column(metric) {
            Ok(column) => column,
            Err(outcome) => return outcome,
        };

        if let Some(expected) = &self.layout.value_label {
            let found = grid
                .cell(expected.row, column)
                .map(|c| c.as_raw_string())
                .unwrap_or_default();
            if found.trim() != expected.label {
                return ExtractOutcome::ValueLabelMismatch { column, found };
            }
        }

        match grid.cell(row, column).map(coerce) {
            Some(CoercedValue::Number(v)) => ExtractOutcome::Value(v),
            Some(CoercedValue::Unparseable(text)) => ExtractOutcome::Unparseable(text),
            Some(CoercedValue::Missing) | None => ExtractOutcome::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::resolve_header;
    use crate::types::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::String(s.to_string())
    }

    /// 見出しインデックス5に指標"M"がある10列のグリッド
    fn offset_grid() -> (SheetGrid, ResolvedHeader) {
        let mut label_row = vec![CellValue::Empty; 10];
        label_row[0] = text("科室");
        label_row[1] = text("X");
        label_row[5] = text("M");
        let mut data_row: Vec<CellValue> = (0..10).map(|i| CellValue::Number(i as f64)).collect();
        data_row[0] = text("外科");

        let grid = SheetGrid::from_rows(vec![label_row.clone(), data_row]);
        let header = resolve_header(&label_row, 0, "科室").unwrap();
        (grid, header)
    }

    #[test]
    fn test_default_layout_rule() {
        let rule = LayoutRule::default();
        assert_eq!(rule.offset_for("2024年1月.xlsx", None), 2);
        assert_eq!(rule.offset_for("2024年11月.xlsx", None), 0);
        assert_eq!(rule.offset_for("2024年12月.xlsx", None), 0);
        assert_eq!(rule.offset_for("2024年2月.xlsx", None), 2);
    }

    #[test]
    fn test_layout_rule_by_month() {
        let rule = LayoutRule {
            default_offset: 3,
            variants: vec![LayoutVariant {
                name: "november".to_string(),
                matcher: VariantMatch::Months(vec![11]),
                offset: 0,
            }],
        };
        let nov = Period::new(2024, 11).ok();
        let jan = Period::new(2024, 1).ok();
        assert_eq!(rule.offset_for("a.xlsx", nov), 0);
        assert_eq!(rule.offset_for("a.xlsx", jan), 3);
        assert_eq!(rule.offset_for("a.xlsx", None), 3);
        assert_eq!(rule.variant_for("a.xlsx", nov).map(|v| v.name.as_str()), Some("november"));
    }

    #[test]
    fn test_offset_application() {
        let (grid, header) = offset_grid();
        let layout = SheetLayout::default();

        let mid_year = MetricExtractor::new(&header, &layout, 2);
        assert_eq!(mid_year.value_column("M"), Ok(7));
        assert_eq!(mid_year.extract(&grid, 1, "M"), ExtractOutcome::Value(7.0));

        let year_end = MetricExtractor::new(&header, &layout, 0);
        assert_eq!(year_end.value_column("M"), Ok(5));
        assert_eq!(year_end.extract(&grid, 1, "M"), ExtractOutcome::Value(5.0));
    }

    #[test]
    fn test_label_not_found() {
        let (grid, header) = offset_grid();
        let layout = SheetLayout::default();
        let extractor = MetricExtractor::new(&header, &layout, 2);
        let outcome = extractor.extract(&grid, 1, "门诊人次");
        assert_eq!(outcome, ExtractOutcome::LabelNotFound);
        assert!(outcome.is_not_found());
    }

    #[test]
    fn test_out_of_range() {
        let (grid, header) = offset_grid();
        let layout = SheetLayout::default();
        let extractor = MetricExtractor::new(&header, &layout, 5);
        assert_eq!(
            extractor.extract(&grid, 1, "M"),
            ExtractOutcome::OutOfRange { column: 10 }
        );
    }

    #[test]
    fn test_fixed_column_ignores_offset() {
        let (grid, header) = offset_grid();
        let layout = SheetLayout {
            fixed_columns: vec![FixedColumn {
                label: "合计得分".to_string(),
                column: 1,
            }],
            ..SheetLayout::default()
        };
        let extractor = MetricExtractor::new(&header, &layout, 2);
        assert_eq!(extractor.extract(&grid, 1, "合计得分"), ExtractOutcome::Value(1.0));
    }

    #[test]
    fn test_missing_and_unparseable_cells() {
        let label_row = vec![text("科室"), text("M"), CellValue::Empty];
        let grid = SheetGrid::from_rows(vec![
            label_row.clone(),
            vec![text("外科"), text("--"), CellValue::Empty],
            vec![text("内科"), text("n/a"), CellValue::Empty],
        ]);
        let header = resolve_header(&label_row, 0, "科室").unwrap();
        let layout = SheetLayout::default();
        let extractor = MetricExtractor::new(&header, &layout, 0);

        let missing = extractor.extract(&grid, 1, "M");
        assert_eq!(missing, ExtractOutcome::Missing);
        assert_eq!(missing.resolve(MissingPolicy::Skip), None);
        assert_eq!(missing.resolve(MissingPolicy::Zero), Some(0.0));

        let unparseable = extractor.extract(&grid, 2, "M");
        assert_eq!(unparseable, ExtractOutcome::Unparseable("n/a".to_string()));
        assert_eq!(unparseable.resolve(MissingPolicy::Skip), None);
        assert_eq!(unparseable.resolve(MissingPolicy::Zero), Some(0.0));

        assert_eq!(ExtractOutcome::LabelNotFound.resolve(MissingPolicy::Zero), None);
    }

    #[test]
    fn test_value_label_check() {
        let label_row = vec![text("科室"), text("出院人次"), CellValue::Empty, CellValue::Empty];
        let sub_row = vec![CellValue::Empty, text("指标"), text("单价"), text(" 工作量 ")];
        let grid = SheetGrid::from_rows(vec![
            label_row.clone(),
            sub_row,
            vec![text("外科"), CellValue::Number(1.0), CellValue::Number(2.0), CellValue::Number(3.0)],
        ]);
        let header = resolve_header(&label_row, 0, "科室").unwrap();
        let layout = SheetLayout {
            value_label: Some(ValueLabel {
                row: 1,
                label: "工作量".to_string(),
            }),
            ..SheetLayout::default()
        };

        let matching = MetricExtractor::new(&header, &layout, 2);
        assert_eq!(matching.extract(&grid, 2, "出院人次"), ExtractOutcome::Value(3.0));

        let mismatching = MetricExtractor::new(&header, &layout, 1);
        assert_eq!(
            mismatching.extract(&grid, 2, "出院人次"),
            ExtractOutcome::ValueLabelMismatch {
                column: 2,
                found: "单价".to_string()
            }
        );
    }

    #[test]
    fn test_layout_rule_deserialize() {
        let json = r#"{
            "default_offset": 3,
            "variants": [
                {"name": "year-end", "match": {"filename_contains": ["11月"]}, "offset": 0}
            ]
        }"#;
        let rule: LayoutRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.default_offset, 3);
        assert_eq!(rule.offset_for("2024年11月.xlsx", None), 0);
        assert_eq!(rule.offset_for("2024年10月.xlsx", None), 3);
    }
}
