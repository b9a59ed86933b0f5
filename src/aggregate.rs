//! Aggregate Module
//!
//! 多数のファイルから抽出された観測値を（科室, 指標, 期間）ごとに蓄積し、
//! 集計統計（合計・件数・平均）を計算するモジュール（Aggregator）。

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::period::Period;

/// 1件の観測値
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub entity: String,
    pub metric: String,
    pub period: Period,
    pub value: f64,
}

/// 指標ごとの集計統計
///
/// JSONのキー名は`平均值`・`数据月份数`・`总值`です。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(rename = "平均值")]
    pub mean: f64,

    #[serde(rename = "数据月份数")]
    pub count: usize,

    #[serde(rename = "总值")]
    pub sum: f64,
}

/// 指定された桁数に丸める
///
/// 桁上げで有限値に収まらない場合は値をそのまま返します。
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

impl Statistics {
    /// 値の列から統計を計算する（空の場合は`None`）
    pub fn compute(values: &[f64], precision: u32) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        let count = values.len();
        Some(Self {
            mean: round_to(sum / count as f64, precision),
            count,
            sum: round_to(sum, precision),
        })
    }
}

/// 1指標の集計結果
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub metric: String,

    /// 期間順の値（丸め済み）
    pub periods: Vec<(Period, f64)>,

    /// 観測値が1件もない場合は`None`
    pub statistics: Option<Statistics>,
}

impl MetricSummary {
    pub fn has_data(&self) -> bool {
        self.statistics.is_some()
    }
}

/// 1科室の集計結果
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySummary {
    pub entity: String,
    pub metrics: Vec<MetricSummary>,
}

/// 全体の集計結果
///
/// 科室・指標は宣言順、期間は暦順に並びます。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub entities: Vec<EntitySummary>,
}

impl Summary {
    /// 観測値が1件もない（科室, 指標）の組
    pub fn missing_pairs(&self) -> Vec<(&str, &str)> {
        self.entities
            .iter()
            .flat_map(|e| {
                e.metrics
                    .iter()
                    .filter(|m| !m.has_data())
                    .map(move |m| (e.entity.as_str(), m.metric.as_str()))
            })
            .collect()
    }
}

/// 観測値の蓄積器
///
/// 同じ（科室, 指標, 期間）への2回目以降の記録は、以前の値を上書きします。
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    entities: Vec<String>,
    metrics: Vec<String>,
    series: HashMap<(String, String), BTreeMap<Period, f64>>,
}

impl Aggregator {
    /// 集計対象として期待する科室と指標を宣言して生成する
    pub fn new<E, M>(entities: E, metrics: M) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let mut aggregator = Self::default();
        for entity in entities {
            aggregator.declare_entity(entity.into());
        }
        for metric in metrics {
            aggregator.declare_metric(metric.into());
        }
        aggregator
    }

    /// 科室を宣言する（宣言済みの場合は何もしない）
    pub fn declare_entity(&mut self, entity: String) {
        if !self.entities.contains(&entity) {
            self.entities.push(entity);
        }
    }

    /// 指標を宣言する（宣言済みの場合は何もしない）
    pub fn declare_metric(&mut self, metric: String) {
        if !self.metrics.contains(&metric) {
            self.metrics.push(metric);
        }
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// 観測値を記録し、上書きされた以前の値を返す
    pub fn record(&mut self, observation: Observation) -> Option<f64> {
        let Observation {
            entity,
            metric,
            period,
            value,
        } = observation;
        self.declare_entity(entity.clone());
        self.declare_metric(metric.clone());
        self.series
            .entry((entity, metric))
            .or_default()
            .insert(period, value)
    }

    /// 記録済みの観測値の総数
    pub fn observation_count(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }

    /// 集計結果を計算する
    ///
    /// すべての科室について宣言済みのすべての指標を出力します。
    pub fn summarize(&self, precision: u32) -> Summary {
        let entities = self
            .entities
            .iter()
            .map(|entity| EntitySummary {
                entity: entity.clone(),
                metrics: self
                    .metrics
                    .iter()
                    .map(|metric| self.summarize_metric(entity, metric, precision))
                    .collect(),
            })
            .collect();
        Summary { entities }
    }

    fn summarize_metric(&self, entity: &str, metric: &str, precision: u32) -> MetricSummary {
        let series = self
            .series
            .get(&(entity.to_string(), metric.to_string()));

        let values: Vec<f64> = series
            .map(|s| s.values().copied().collect())
            .unwrap_or_default();
        let periods = series
            .map(|s| {
                s.iter()
                    .map(|(period, value)| (*period, round_to(*value, precision)))
                    .collect()
            })
            .unwrap_or_default();

        MetricSummary {
            metric: metric.to_string(),
            periods,
            statistics: Statistics::compute(&values, precision),
        }
    }
}
