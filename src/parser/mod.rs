//! Parser Module
//!
//! calamineを使用したワークブック読み込みの実装。
//! xls・xlsxの両形式を扱い、シートを稠密なグリッドとして取り出します。

mod workbook;

pub use workbook::{WorkbookReader, MAX_INPUT_FILE_SIZE};
