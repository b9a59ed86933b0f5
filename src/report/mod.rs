//! Report Module
//!
//! 集計結果（`Summary`）をレポート形式に射影し、各種出力先へ書き出すモジュール。
//! すべてのレポートは同じ`Summary`から計算され、ソースファイルを再走査しません。
//!
//! - 完全版: 期間ごとの値と統計
//! - 簡易版: 平均値と件数のみ
//! - データなし: 観測値が1件もない（科室, 指標）の一覧

mod json;
mod ordered;
mod table;
mod xlsx;

use serde::{Deserialize, Serialize};

use crate::aggregate::{Statistics, Summary};
use crate::error::Result;

pub use json::{write_json, write_json_file};
pub use ordered::OrderedMap;
pub use table::render_summary_table;
pub use xlsx::{
    build_entity_sheets, build_flat_table, sanitize_sheet_name, write_entity_sheets,
    write_flat_table,
};
pub(crate) use xlsx::unique_sheet_name;

/// 完全版レポートの1指標分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub monthly_data: OrderedMap<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
}

/// 簡易版レポートの1指標分
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimpleEntry {
    #[serde(rename = "平均值")]
    pub mean: f64,

    #[serde(rename = "数据月份数")]
    pub count: usize,
}

/// データなしレポートの1指標分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoDataEntry {
    #[serde(rename = "状态")]
    pub status: String,

    #[serde(rename = "说明")]
    pub note: String,
}

impl Default for NoDataEntry {
    fn default() -> Self {
        Self {
            status: "无数据".to_string(),
            note: "未找到任何月份的数据".to_string(),
        }
    }
}

/// 完全版レポート: 科室 → 指標 → 期間別データと統計
pub type FullReport = OrderedMap<OrderedMap<MetricEntry>>;

/// 簡易版レポート: 科室 → 指標 → 平均値と件数
pub type SimpleReport = OrderedMap<OrderedMap<SimpleEntry>>;

/// データなしレポート: 科室 → 指標 → 状態
pub type NoDataReport = OrderedMap<OrderedMap<NoDataEntry>>;

/// レポートの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportShape {
    Full,
    Simple,
    NoData,
}

impl Summary {
    /// 完全版レポートへの射影
    pub fn to_full_report(&self) -> FullReport {
        let mut report = OrderedMap::new();
        for entity in &self.entities {
            let mut metrics = OrderedMap::new();
            for metric in &entity.metrics {
                let mut monthly_data = OrderedMap::new();
                for (period, value) in &metric.periods {
                    monthly_data.insert(period.label(), *value);
                }
                metrics.insert(
                    metric.metric.clone(),
                    MetricEntry {
                        monthly_data,
                        statistics: metric.statistics,
                    },
                );
            }
            report.insert(entity.entity.clone(), metrics);
        }
        report
    }

    /// 簡易版レポートへの射影（データのある指標のみ）
    pub fn to_simple_report(&self) -> SimpleReport {
        let mut report = OrderedMap::new();
        for entity in &self.entities {
            let mut metrics = OrderedMap::new();
            for metric in &entity.metrics {
                if let Some(stats) = metric.statistics {
                    metrics.insert(
                        metric.metric.clone(),
                        SimpleEntry {
                            mean: stats.mean,
                            count: stats.count,
                        },
                    );
                }
            }
            report.insert(entity.entity.clone(), metrics);
        }
        report
    }

    /// データなしレポートへの射影（データのない指標を持つ科室のみ）
    pub fn to_no_data_report(&self) -> NoDataReport {
        let mut report = OrderedMap::new();
        for entity in &self.entities {
            let mut metrics = OrderedMap::new();
            for metric in entity.metrics.iter().filter(|m| !m.has_data()) {
                metrics.insert(metric.metric.clone(), NoDataEntry::default());
            }
            if !metrics.is_empty() {
                report.insert(entity.entity.clone(), metrics);
            }
        }
        report
    }

    /// 指定された種類のレポートをJSON文字列として出力する
    pub fn to_json_string(&self, shape: ReportShape) -> Result<String> {
        let mut buffer = Vec::new();
        match shape {
            ReportShape::Full => write_json(&self.to_full_report(), &mut buffer)?,
            ReportShape::Simple => write_json(&self.to_simple_report(), &mut buffer)?,
            ReportShape::NoData => write_json(&self.to_no_data_report(), &mut buffer)?,
        }
        String::from_utf8(buffer).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e).into()
        })
    }
}

/// 読み込んだレポートの1指標分（完全版・簡易版のどちらか）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoadedMetric {
    Full(MetricEntry),
    Simple(SimpleEntry),
}

impl LoadedMetric {
    /// 平均値と件数
    pub fn mean_and_count(&self) -> Option<(f64, usize)> {
        match self {
            LoadedMetric::Full(entry) => entry.statistics.map(|s| (s.mean, s.count)),
            LoadedMetric::Simple(entry) => Some((entry.mean, entry.count)),
        }
    }

    /// 合計（完全版のみ）
    pub fn sum(&self) -> Option<f64> {
        match self {
            LoadedMetric::Full(entry) => entry.statistics.map(|s| s.sum),
            LoadedMetric::Simple(_) => None,
        }
    }

    /// 期間別データ（簡易版は空）
    pub fn monthly_data(&self) -> Option<&OrderedMap<f64>> {
        match self {
            LoadedMetric::Full(entry) => Some(&entry.monthly_data),
            LoadedMetric::Simple(_) => None,
        }
    }
}

/// 既存のJSONレポート（完全版または簡易版）
///
/// 別のツールが出力したレポートを読み込み、スプレッドシートへ変換する際に使用します。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportDocument {
    pub entities: OrderedMap<OrderedMap<LoadedMetric>>,
}

impl ReportDocument {
    /// JSON文字列から読み込む
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// JSONから読み込む
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// JSONファイルから読み込む
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}

impl From<&Summary> for ReportDocument {
    fn from(summary: &Summary) -> Self {
        let mut entities = OrderedMap::new();
        for (entity, metrics) in summary.to_full_report() {
            let mut loaded = OrderedMap::new();
            for (metric, entry) in metrics {
                loaded.insert(metric, LoadedMetric::Full(entry));
            }
            entities.insert(entity, loaded);
        }
        Self { entities }
    }
}
