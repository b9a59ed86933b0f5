//! Types Module
//!
//! クレート全体で使用する共通データ型と、セル値の数値変換を定義するモジュール。

use calamine::Data;

/// 数値変換時に「データなし」として扱うプレースホルダー文字列
const MISSING_SENTINELS: &[&str] = &["--", "-", "—", "/"];

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// 日付・時刻（Excelシリアル値）
    DateTime(f64),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 値を文字列として取得（書式適用前）
    pub fn as_raw_string(&self) -> String {
        match self {
            CellValue::Number(n) | CellValue::DateTime(n) => n.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }

    /// 見出しラベルとして取得
    ///
    /// 空セルと空文字列は`None`（ラベルなし）として扱います。
    /// ラベルは前後の空白も含めてそのまま保持します。
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::String(s) if s.is_empty() => None,
            other => Some(other.as_raw_string()),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::String(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
            // Excelの表記（例: `#DIV/0!`）
            Data::Error(e) => CellValue::Error(e.to_string()),
            Data::Empty => CellValue::Empty,
            #[allow(unreachable_patterns)]
            _ => CellValue::Empty,
        }
    }
}

/// 数値変換の結果
///
/// セルが数値・欠損・解釈不能のいずれであるかを明示的に区別します。
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    /// 数値として解釈できた
    Number(f64),

    /// 空セル、またはプレースホルダー（`--`など）
    Missing,

    /// 値は存在するが数値として解釈できない（元のテキストを保持）
    Unparseable(String),
}

/// セル値を数値に変換する
///
/// - 数値セルはそのまま（NaNは`Missing`）
/// - 文字列は前後の空白を除去してから判定し、空文字列とプレースホルダーは`Missing`、
///   f64として解釈できれば`Number`、それ以外は`Unparseable`
/// - 論理値・日付・エラー値は`Unparseable`
pub fn coerce(value: &CellValue) -> CoercedValue {
    match value {
        CellValue::Number(n) if n.is_nan() => CoercedValue::Missing,
        CellValue::Number(n) => CoercedValue::Number(*n),
        CellValue::Empty => CoercedValue::Missing,
        CellValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || MISSING_SENTINELS.contains(&trimmed) {
                return CoercedValue::Missing;
            }
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => CoercedValue::Number(n),
                _ => CoercedValue::Unparseable(s.clone()),
            }
        }
        other => CoercedValue::Unparseable(other.as_raw_string()),
    }
}
