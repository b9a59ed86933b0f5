//! Grid Module
//!
//! calamineのスパースな`Range`から稠密なグリッド構造への変換と、
//! 科室行の検索（Row Matcher）を提供するモジュール。

use calamine::{Data, Range};

use crate::types::CellValue;

/// ワークシートの稠密なグリッド
///
/// 行・列インデックスはワークシート上の絶対座標（0始まり）です。
/// calamineの`Range`は最初の非空セルから始まるため、その開始位置を
/// 空セルで埋めて座標を揃えます。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetGrid {
    /// グリッドデータ（行 × 列）
    cells: Vec<Vec<CellValue>>,

    /// 列数
    cols: usize,
}

impl SheetGrid {
    /// 行データから直接グリッドを構築する
    ///
    /// 行ごとの長さが異なる場合は、最も長い行に合わせて空セルで埋めます。
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let cells = rows
            .into_iter()
            .map(|mut row| {
                row.resize(cols, CellValue::Empty);
                row
            })
            .collect();
        Self { cells, cols }
    }

    /// calamineの`Range`からグリッドを構築する
    pub fn from_range(range: &Range<Data>) -> Self {
        let Some((start_row, start_col)) = range.start() else {
            return Self::default();
        };
        let (height, width) = range.get_size();

        let rows = start_row as usize + height;
        let cols = start_col as usize + width;
        let mut cells = vec![vec![CellValue::Empty; cols]; rows];

        for (row_offset, row) in range.rows().enumerate() {
            let grid_row = &mut cells[start_row as usize + row_offset];
            for (col_offset, cell) in row.iter().enumerate() {
                grid_row[start_col as usize + col_offset] = CellValue::from(cell);
            }
        }

        Self { cells, cols }
    }

    /// 行数
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// 列数
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 指定行を取得する
    pub fn row(&self, row: usize) -> Option<&[CellValue]> {
        self.cells.get(row).map(Vec::as_slice)
    }

    /// 指定セルを取得する（範囲外は`None`）
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// 指定された列（元の座標）をすべての行から削除する
    ///
    /// 削除後は右側の列が左に詰められます。範囲外のインデックスは無視します。
    pub fn drop_columns(&mut self, columns: &[usize]) {
        if columns.is_empty() {
            return;
        }
        let mut targets: Vec<usize> = columns
            .iter()
            .copied()
            .filter(|&c| c < self.cols)
            .collect();
        targets.sort_unstable();
        targets.dedup();

        for row in &mut self.cells {
            for &col in targets.iter().rev() {
                row.remove(col);
            }
        }
        self.cols -= targets.len();
    }

    /// 科室名に一致する最初のデータ行を検索する
    ///
    /// `first_data_row`以降の行のうち、先頭列が`entity`と完全一致する
    /// 文字列セルを持つ最初の行のインデックスを返します。
    /// 前後の空白除去や大文字小文字の同一視は行いません。
    pub fn find_entity_row(&self, entity: &str, first_data_row: usize) -> Option<usize> {
        self.cells
            .iter()
            .enumerate()
            .skip(first_data_row)
            .find(|(_, row)| matches!(row.first(), Some(CellValue::String(name)) if name == entity))
            .map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::String(s.to_string())
    }

    fn sample_grid() -> SheetGrid {
        SheetGrid::from_rows(vec![
            vec![text("科室"), text("出院人次")],
            vec![text("外科"), CellValue::Number(1.0)],
            vec![text("外科 "), CellValue::Number(2.0)],
            vec![text("内科"), CellValue::Number(3.0)],
            vec![text("外科"), CellValue::Number(4.0)],
        ])
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let grid = SheetGrid::from_rows(vec![vec![text("a")], vec![text("b"), text("c")]]);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 2);
        assert_eq!(grid.cell(0, 1), Some(&CellValue::Empty));
        assert_eq!(grid.cell(0, 2), None);
    }

    #[test]
    fn test_from_range_keeps_absolute_coordinates() {
        let mut range = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("科室".to_string()));
        range.set_value((3, 2), Data::Float(5.0));

        let grid = SheetGrid::from_range(&range);
        assert_eq!(grid.rows(), 4);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.cell(2, 1), Some(&text("科室")));
        assert_eq!(grid.cell(3, 2), Some(&CellValue::Number(5.0)));
        assert_eq!(grid.cell(0, 0), Some(&CellValue::Empty));
    }

    #[test]
    fn test_from_empty_range() {
        let range: Range<Data> = Range::empty();
        let grid = SheetGrid::from_range(&range);
        assert_eq!(grid.rows(), 0);
        assert_eq!(grid.cols(), 0);
    }

    #[test]
    fn test_drop_columns() {
        let mut grid = SheetGrid::from_rows(vec![vec![text("a"), text("b"), text("c"), text("d")]]);
        grid.drop_columns(&[1, 3, 9]);
        assert_eq!(grid.cols(), 2);
        assert_eq!(grid.row(0).unwrap(), &[text("a"), text("c")]);
    }

    #[test]
    fn test_find_entity_row_first_match() {
        let grid = sample_grid();
        assert_eq!(grid.find_entity_row("外科", 1), Some(1));
        assert_eq!(grid.find_entity_row("内科", 1), Some(3));
    }

    #[test]
    fn test_find_entity_row_is_exact() {
        let grid = sample_grid();
        // 末尾の空白を含む名前は別の科室として扱う
        assert_eq!(grid.find_entity_row("外科 ", 1), Some(2));
        assert_eq!(grid.find_entity_row("骨科", 1), None);
    }

    #[test]
    fn test_find_entity_row_skips_label_rows() {
        let grid = sample_grid();
        assert_eq!(grid.find_entity_row("科室", 1), None);
        assert_eq!(grid.find_entity_row("外科", 2), Some(4));
    }
}
