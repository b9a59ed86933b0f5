//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::{Deserialize, Serialize};

/// シート選択方式
///
/// 各ワークブックから指標を読み取るシートを指定します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSelector {
    /// インデックス指定（0始まり）
    ///
    /// 例: `SheetSelector::Index(0)` は最初のシートを選択（デフォルト）
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Sheet1".to_string())`
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::Index(index) => write!(f, "#{}", index),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// 集計対象の指標の選び方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSelection {
    /// 指定された指標のみ（指定順に出力）
    Listed(Vec<String>),

    /// 最初に読み込めたファイルの見出しからすべての指標を推定する
    ///
    /// 見出しの列順に、科室列を除く重複のないラベルを指標とします。
    /// 固定列の指標は末尾に追加されます。
    InferAll,
}

impl Default for MetricSelection {
    fn default() -> Self {
        MetricSelection::InferAll
    }
}

impl From<Vec<String>> for MetricSelection {
    fn from(metrics: Vec<String>) -> Self {
        if metrics.is_empty() {
            MetricSelection::InferAll
        } else {
            MetricSelection::Listed(metrics)
        }
    }
}
