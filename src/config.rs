//! Config Module
//!
//! JSON設定ファイルの読み込みと、集計結果の出力先設定を扱うモジュール。
//!
//! ```json
//! {
//!   "source_dir": "reports/2024",
//!   "entities": ["外科", "内科"],
//!   "metrics": ["出院人次", "门诊人次"],
//!   "layout_rule": {
//!     "default_offset": 2,
//!     "variants": [
//!       {"name": "year-end", "match": {"filename_contains": ["11月", "12月"]}, "offset": 0}
//!     ]
//!   },
//!   "output": {"dir": "out", "xlsx_report": "指标统计.xlsx"}
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::Summary;
use crate::api::{MetricSelection, SheetSelector};
use crate::builder::PipelineBuilder;
use crate::error::Result;
use crate::extract::{LayoutRule, MissingPolicy, SheetLayout};
use crate::period::PeriodGranularity;
use crate::report::{write_entity_sheets, write_flat_table, write_json_file, ReportDocument};

fn default_precision() -> u32 {
    4
}

fn default_extensions() -> Vec<String> {
    vec!["xlsx".to_string()]
}

fn default_parallel() -> bool {
    true
}

/// 設定ファイル
///
/// `source_dir`と`entities`以外のすべての項目にはデフォルト値があります。
/// `metrics`が空の場合は見出しから指標を推定します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub source_dir: PathBuf,

    pub entities: Vec<String>,

    #[serde(default)]
    pub metrics: Vec<String>,

    #[serde(default)]
    pub layout: SheetLayout,

    #[serde(default)]
    pub layout_rule: LayoutRule,

    #[serde(default)]
    pub sheet: SheetSelector,

    #[serde(default)]
    pub missing_policy: MissingPolicy,

    #[serde(default)]
    pub granularity: PeriodGranularity,

    #[serde(default = "default_precision")]
    pub precision: u32,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_parallel")]
    pub parallel: bool,

    #[serde(default)]
    pub output: OutputConfig,
}

impl ConfigFile {
    /// 必須項目のみを指定して、残りをデフォルト値で生成する
    pub fn new(source_dir: impl Into<PathBuf>, entities: Vec<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            entities,
            metrics: Vec::new(),
            layout: SheetLayout::default(),
            layout_rule: LayoutRule::default(),
            sheet: SheetSelector::default(),
            missing_policy: MissingPolicy::default(),
            granularity: PeriodGranularity::default(),
            precision: default_precision(),
            extensions: default_extensions(),
            parallel: default_parallel(),
            output: OutputConfig::default(),
        }
    }

    /// JSON文字列から読み込む
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// JSONファイルから読み込む
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// 設定内容を反映したビルダーを生成する
    ///
    /// 検証は`PipelineBuilder::build()`で行われます。
    pub fn to_builder(&self) -> PipelineBuilder {
        PipelineBuilder::new(&self.source_dir)
            .with_entities(self.entities.iter().cloned())
            .with_metrics(MetricSelection::from(self.metrics.clone()))
            .with_layout(self.layout.clone())
            .with_layout_rule(self.layout_rule.clone())
            .with_sheet_selector(self.sheet.clone())
            .with_missing_policy(self.missing_policy)
            .with_granularity(self.granularity)
            .with_precision(self.precision)
            .with_extensions(&self.extensions)
            .parallel(self.parallel)
    }
}

/// 出力先の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 出力ディレクトリ
    pub dir: PathBuf,

    /// 完全版JSONレポートのファイル名
    pub full_report: String,

    /// 簡易版JSONレポートのファイル名
    pub simple_report: String,

    /// データなしJSONレポートのファイル名
    pub no_data_report: String,

    /// 一覧表xlsxのファイル名（未指定の場合は出力しない）
    pub xlsx_report: Option<String>,

    /// 科室別シートxlsxのファイル名（未指定の場合は出力しない）
    pub entity_sheets_report: Option<String>,

    /// 科室別シートのタイトル接頭辞（例: `"2024年"`）
    pub title_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            full_report: "医疗业务指标统计结果.json".to_string(),
            simple_report: "医疗业务指标简化统计.json".to_string(),
            no_data_report: "无数据科室统计.json".to_string(),
            xlsx_report: None,
            entity_sheets_report: None,
            title_prefix: String::new(),
        }
    }
}

/// 設定されたすべての出力先へレポートを書き出す
///
/// データなしレポートは、データのない指標が1つ以上ある場合のみ出力します。
///
/// # 戻り値
///
/// * `Ok(Vec<PathBuf>)` - 書き出したファイルのパス（書き出し順）
pub fn emit_reports(summary: &Summary, output: &OutputConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&output.dir)?;
    let mut written = Vec::new();

    let path = output.dir.join(&output.full_report);
    write_json_file(&summary.to_full_report(), &path)?;
    written.push(path);

    let path = output.dir.join(&output.simple_report);
    write_json_file(&summary.to_simple_report(), &path)?;
    written.push(path);

    let no_data = summary.to_no_data_report();
    if !no_data.is_empty() {
        let path = output.dir.join(&output.no_data_report);
        write_json_file(&no_data, &path)?;
        written.push(path);
    }

    if output.xlsx_report.is_some() || output.entity_sheets_report.is_some() {
        let document = ReportDocument::from(summary);
        if let Some(name) = &output.xlsx_report {
            let path = output.dir.join(name);
            write_flat_table(&document, &path)?;
            written.push(path);
        }
        if let Some(name) = &output.entity_sheets_report {
            let path = output.dir.join(name);
            write_entity_sheets(&document, &output.title_prefix, &path)?;
            written.push(path);
        }
    }

    Ok(written)
}
