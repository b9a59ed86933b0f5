//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// sheetmetricsクレート全体で使用するエラー型
///
/// ワークブックの読み込み、ヘッダー解決、レポート出力中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// 抽出パイプラインでは、ファイル単位のエラーは致命的ではありません。
/// `Pipeline::run()`はファイルごとにエラーを捕捉し、そのファイルを
/// スキップ扱いとして記録した上で処理を継続します。
/// 致命的になるのは設定エラーとソースディレクトリの読み込み失敗のみです。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetmetrics::SheetMetricsError;
/// use std::fs::File;
///
/// fn open_report(path: &str) -> Result<(), SheetMetricsError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum SheetMetricsError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブックの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// JSONのシリアライズ・デシリアライズ中に発生したエラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XLSXファイルの書き込み中に発生したエラー（rust_xlsxwriter由来）
    #[error("Failed to write XLSX file: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// 設定の検証に失敗したエラー
    ///
    /// `PipelineBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。例えば、科室リストが空の場合や、小数点以下の
    /// 桁数が大きすぎる場合などです。
    ///
    /// ```rust,no_run
    /// use sheetmetrics::{PipelineBuilder, SheetMetricsError};
    ///
    /// let result = PipelineBuilder::new("reports").build();
    ///
    /// match result {
    ///     Err(SheetMetricsError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 指定されたシートがワークブックに存在しない
    #[error("Sheet {0} not found")]
    SheetNotFound(String),

    /// 見出し行が空、またはラベルを1つも含まない
    #[error("Label row {row} is empty")]
    EmptyHeader {
        /// 見出し行のインデックス（0始まり）
        row: usize,
    },

    /// 入力ファイルがサイズ上限を超えている
    #[error("Input file size exceeds maximum: {size} bytes (max: {max} bytes)")]
    FileTooLarge {
        /// 実際のファイルサイズ
        size: u64,
        /// 許容される最大サイズ
        max: u64,
    },

    /// 期間ラベルを解釈できない
    #[error("Invalid period: '{0}'")]
    InvalidPeriod(String),
}

/// クレート内で使用する`Result`型エイリアス
pub type Result<T> = std::result::Result<T, SheetMetricsError>;
