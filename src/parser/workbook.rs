//! ワークブックリーダー
//!
//! calamineのラッパーとして、ファイルを開く際のサイズ検査とシート選択を提供します。

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader, Sheets};

use crate::api::SheetSelector;
use crate::error::{Result, SheetMetricsError};
use crate::grid::SheetGrid;

/// 入力ファイルの最大サイズ（バイト）
///
/// デフォルト: 2GB (2_147_483_648 bytes)
pub const MAX_INPUT_FILE_SIZE: u64 = 2_147_483_648;

/// ワークブックリーダー
///
/// 拡張子から形式（xls / xlsx / xlsb / ods）を判別して開きます。
pub struct WorkbookReader {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl WorkbookReader {
    /// ワークブックを開く
    ///
    /// # 引数
    ///
    /// * `path` - ワークブックのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookReader)` - 読み込みに成功した場合
    /// * `Err(SheetMetricsError::FileTooLarge)` - ファイルがサイズ上限を超える場合
    /// * `Err(SheetMetricsError::Parse)` - ワークブックとして解釈できない場合
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_limit(path, MAX_INPUT_FILE_SIZE)
    }

    /// サイズ上限を指定してワークブックを開く
    pub fn open_with_limit(path: &Path, max_size: u64) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();
        if size > max_size {
            return Err(SheetMetricsError::FileTooLarge {
                size,
                max: max_size,
            });
        }

        let workbook = open_workbook_auto(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// シート選択方式に基づいてシート名を解決する
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 選択されたシート名
    /// * `Err(SheetMetricsError::SheetNotFound)` - シートが存在しない、またはインデックスが範囲外の場合
    pub fn resolve_sheet(&self, selector: &SheetSelector) -> Result<String> {
        let names = self.sheet_names();
        match selector {
            SheetSelector::Index(index) => names
                .get(*index)
                .cloned()
                .ok_or_else(|| SheetMetricsError::SheetNotFound(selector.to_string())),
            SheetSelector::Name(name) => {
                if names.contains(name) {
                    Ok(name.clone())
                } else {
                    Err(SheetMetricsError::SheetNotFound(selector.to_string()))
                }
            }
        }
    }

    /// 選択されたシートをグリッドとして読み込む
    pub fn read_grid(&mut self, selector: &SheetSelector) -> Result<SheetGrid> {
        let name = self.resolve_sheet(selector)?;
        let range = self.workbook.worksheet_range(&name)?;
        Ok(SheetGrid::from_range(&range))
    }

    /// すべてのシートを（シート名, グリッド）の組として読み込む
    pub fn sheet_grids(&mut self) -> Result<Vec<(String, SheetGrid)>> {
        let mut grids = Vec::new();
        for name in self.sheet_names() {
            let range = self.workbook.worksheet_range(&name)?;
            grids.push((name, SheetGrid::from_range(&range)));
        }
        Ok(grids)
    }
}
