//! Builder Module
//!
//! Fluent Builder APIを提供し、`Pipeline`インスタンスを段階的に構築する。
//! `Pipeline`はディレクトリ内の月次ワークブックを走査し、科室ごとの指標を集計します。

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregator, Observation, Summary};
use crate::api::{MetricSelection, SheetSelector};
use crate::error::{Result, SheetMetricsError};
use crate::extract::{ExtractOutcome, LayoutRule, MetricExtractor, MissingPolicy, SheetLayout};
use crate::grid::SheetGrid;
use crate::header::{resolve_header, ResolvedHeader};
use crate::parser::WorkbookReader;
use crate::period::{Period, PeriodGranularity};

/// 統計値の小数点以下桁数の上限
const MAX_PRECISION: u32 = 10;

/// 集計処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct PipelineConfig {
    /// 月次ワークブックを格納したディレクトリ
    pub source_dir: PathBuf,

    /// 集計対象の科室（出力順）
    pub entities: Vec<String>,

    /// 集計対象の指標
    pub metrics: MetricSelection,

    /// ワークシートのレイアウト
    pub layout: SheetLayout,

    /// 値列のオフセット規則
    pub layout_rule: LayoutRule,

    /// シート選択方式
    pub sheet_selector: SheetSelector,

    /// 欠損値の扱い
    pub missing_policy: MissingPolicy,

    /// 期間の粒度
    pub granularity: PeriodGranularity,

    /// 統計値の小数点以下桁数
    pub precision: u32,

    /// 対象とするファイル拡張子（小文字、ドットなし）
    pub extensions: Vec<String>,

    /// ファイル単位の抽出を並列に行うか
    pub parallel: bool,
}

impl PipelineConfig {
    fn new(source_dir: PathBuf) -> Self {
        Self {
            source_dir,
            entities: Vec::new(),
            metrics: MetricSelection::default(),
            layout: SheetLayout::default(),
            layout_rule: LayoutRule::default(),
            sheet_selector: SheetSelector::default(),
            missing_policy: MissingPolicy::default(),
            granularity: PeriodGranularity::default(),
            precision: 4,
            extensions: vec!["xlsx".to_string()],
            parallel: true,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Pipeline`インスタンスを段階的に構築するためのビルダーです。
/// ソースディレクトリと科室リスト以外の設定項目にはデフォルト値があります。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetmetrics::{MetricSelection, PipelineBuilder};
///
/// # fn main() -> Result<(), sheetmetrics::SheetMetricsError> {
/// let pipeline = PipelineBuilder::new("reports/2024")
///     .with_entities(["外科", "内科"])
///     .with_metrics(MetricSelection::Listed(vec!["出院人次".to_string()]))
///     .build()?;
/// let outcome = pipeline.run()?;
/// println!("{} files processed", outcome.processed_files.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PipelineBuilder {
    /// 内部設定（構築中）
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 指標: 見出しから推定
    /// - レイアウト: 見出し行3、データ開始行5、先頭列ラベル`"科室"`
    /// - オフセット規則: +2（ファイル名に11月・12月を含む場合は+0）
    /// - シート選択: 最初のシート
    /// - 欠損値: 記録しない
    /// - 期間の粒度: 月のみ（`"01月"`）
    /// - 小数点以下桁数: 4
    /// - 拡張子: `xlsx`
    /// - 並列抽出: 有効
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: PipelineConfig::new(source_dir.into()),
        }
    }

    /// ソースディレクトリを変更する
    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.config.source_dir = source_dir.into();
        self
    }

    /// 集計対象の科室を指定する（既存の指定を置き換える）
    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.entities = entities.into_iter().map(Into::into).collect();
        self
    }

    /// 集計対象の科室を1つ追加する
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.config.entities.push(entity.into());
        self
    }

    /// 集計対象の指標を指定する
    pub fn with_metrics(mut self, metrics: MetricSelection) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// 集計対象の指標を1つ追加する
    ///
    /// 推定モードが指定されていた場合は、列挙モードに切り替わります。
    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        match &mut self.config.metrics {
            MetricSelection::Listed(metrics) => metrics.push(metric.into()),
            MetricSelection::InferAll => {
                self.config.metrics = MetricSelection::Listed(vec![metric.into()]);
            }
        }
        self
    }

    /// ワークシートのレイアウトを指定する
    pub fn with_layout(mut self, layout: SheetLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// 値列のオフセット規則を指定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use sheetmetrics::{LayoutRule, PipelineBuilder};
    ///
    /// // すべてのファイルで+3
    /// let builder = PipelineBuilder::new("reports")
    ///     .with_layout_rule(LayoutRule::fixed(3));
    /// ```
    pub fn with_layout_rule(mut self, rule: LayoutRule) -> Self {
        self.config.layout_rule = rule;
        self
    }

    /// 読み取るシートを選択する
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// 欠損値・解釈不能値の扱いを指定する
    pub fn with_missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.config.missing_policy = policy;
        self
    }

    /// 期間の粒度を指定する
    pub fn with_granularity(mut self, granularity: PeriodGranularity) -> Self {
        self.config.granularity = granularity;
        self
    }

    /// 統計値の小数点以下桁数を指定する
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.config.precision = precision;
        self
    }

    /// 対象とするファイル拡張子を指定する（例: `["xlsx", "xls"]`）
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// ファイル単位の抽出を並列に行うかを指定する
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// 設定を検証し、`Pipeline`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `SheetMetricsError::Config(String)`: 設定の検証に失敗した場合
    ///   * 科室リストが空、空の名前または重複を含む
    ///   * 列挙された指標が空、または重複を含む
    ///   * 小数点以下桁数が10を超える
    ///   * データ開始行が見出し行以前
    ///   * 拡張子リストが空
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config;

        // 1. 科室リストの検証
        if config.entities.is_empty() {
            return Err(SheetMetricsError::Config(
                "entity list is empty".to_string(),
            ));
        }
        if config.entities.iter().any(|e| e.is_empty()) {
            return Err(SheetMetricsError::Config(
                "entity name must not be empty".to_string(),
            ));
        }
        if let Some(dup) = first_duplicate(&config.entities) {
            return Err(SheetMetricsError::Config(format!(
                "duplicate entity: '{}'",
                dup
            )));
        }

        // 2. 指標リストの検証
        if let MetricSelection::Listed(metrics) = &config.metrics {
            if metrics.is_empty() {
                return Err(SheetMetricsError::Config(
                    "metric list is empty".to_string(),
                ));
            }
            if let Some(dup) = first_duplicate(metrics) {
                return Err(SheetMetricsError::Config(format!(
                    "duplicate metric: '{}'",
                    dup
                )));
            }
        }

        // 3. 数値設定の検証
        if config.precision > MAX_PRECISION {
            return Err(SheetMetricsError::Config(format!(
                "precision {} exceeds maximum ({})",
                config.precision, MAX_PRECISION
            )));
        }
        if config.layout.data_start_row <= config.layout.label_row {
            return Err(SheetMetricsError::Config(format!(
                "data start row ({}) must be after label row ({})",
                config.layout.data_start_row, config.layout.label_row
            )));
        }
        if config.extensions.is_empty() {
            return Err(SheetMetricsError::Config(
                "extension list is empty".to_string(),
            ));
        }

        Ok(Pipeline { config })
    }
}

fn first_duplicate(items: &[String]) -> Option<&str> {
    items
        .iter()
        .enumerate()
        .find(|(idx, item)| items[..*idx].contains(item))
        .map(|(_, item)| item.as_str())
}

/// 処理されなかったファイル
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// 見つからなかった指標（ファイル, 科室, 指標ごと）
#[derive(Debug, Clone, PartialEq)]
pub struct MetricMiss {
    pub file: String,
    pub entity: String,
    pub metric: String,
    pub outcome: ExtractOutcome,
}

/// データ行が見つからなかった科室
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMiss {
    pub file: String,
    pub entity: String,
}

/// 集計処理の結果
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// 集計結果
    pub summary: Summary,

    /// 処理されたファイル（ファイル名順）
    pub processed_files: Vec<String>,

    /// スキップされたファイル
    pub skipped_files: Vec<SkippedFile>,

    /// 見出しに存在しなかった指標
    pub metric_misses: Vec<MetricMiss>,

    /// データ行が見つからなかった科室
    pub missing_entities: Vec<EntityMiss>,
}

/// 走査対象のファイル
#[derive(Debug, Clone)]
struct SourceFile {
    name: String,
    path: PathBuf,
    period: Period,
    offset: usize,
}

/// 見出しを解決済みのシート
struct LoadedSheet {
    source: SourceFile,
    grid: SheetGrid,
    header: ResolvedHeader,
}

/// 1ファイル分の抽出結果（科室, 指標, 結果）
struct FileExtraction {
    values: Vec<(String, String, ExtractOutcome)>,
    missing_entities: Vec<String>,
}

/// 集計処理のファサード
///
/// `PipelineBuilder`を使用して構築された設定に基づいて集計処理を実行します。
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn source_dir(&self) -> &Path {
        &self.config.source_dir
    }

    pub fn entities(&self) -> &[String] {
        &self.config.entities
    }

    /// 集計処理を実行する
    ///
    /// # 処理フロー
    ///
    /// 1. ディレクトリを走査し、対象ファイルをファイル名順に並べる
    /// 2. ファイル名から期間を求める（求められないファイルはスキップ）
    /// 3. 各ファイルのシートを読み込み、見出しを解決する（並列）
    /// 4. 指標リストを確定する（推定モードでは最初に読み込めたファイルから）
    /// 5. 各ファイルから科室・指標ごとの値を抽出する（並列）
    /// 6. 抽出結果をファイル名順に集計器へ適用する
    ///
    /// ファイル単位の失敗は`RunOutcome::skipped_files`に記録され、処理は継続します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(RunOutcome)` - 集計に成功した場合
    /// * `Err(SheetMetricsError::Io)` - ソースディレクトリを読み込めない場合
    pub fn run(&self) -> Result<RunOutcome> {
        let mut skipped_files = Vec::new();

        // 1-2. ファイルの列挙と期間の解決
        let mut sources = Vec::new();
        for name in self.list_files(&mut skipped_files)? {
            match Period::from_file_name(&name) {
                Some(period) => {
                    let period = period.with_granularity(self.config.granularity);
                    let offset = self.config.layout_rule.offset_for(&name, Some(period));
                    sources.push(SourceFile {
                        path: self.config.source_dir.join(&name),
                        name,
                        period,
                        offset,
                    });
                }
                None => {
                    warn!("Skipping {}: no period in file name", name);
                    skipped_files.push(SkippedFile {
                        file: name,
                        reason: "no period in file name".to_string(),
                    });
                }
            }
        }
        info!(
            "Found {} source files in {}",
            sources.len(),
            self.config.source_dir.display()
        );

        // 3. シートの読み込み
        let mut sheets = Vec::new();
        for (source, loaded) in sources
            .iter()
            .zip(self.fan_out(&sources, |source| self.load_sheet(source)))
        {
            match loaded {
                Ok(sheet) => sheets.push(sheet),
                Err(e) => {
                    warn!("Skipping {}: {}", source.name, e);
                    skipped_files.push(SkippedFile {
                        file: source.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // 4. 指標リストの確定
        let metrics = self.resolve_metrics(&sheets);
        let mut aggregator = Aggregator::new(self.config.entities.iter().cloned(), metrics.clone());

        // 5. 抽出
        let extractions = self.fan_out(&sheets, |sheet| self.extract_sheet(sheet, &metrics));

        // 6. 集計（ファイル名順）
        let mut processed_files = Vec::new();
        let mut metric_misses = Vec::new();
        let mut missing_entities = Vec::new();

        for (sheet, extraction) in sheets.iter().zip(extractions) {
            let source = &sheet.source;
            info!(
                "Processing {} (period {}, offset +{})",
                source.name, source.period, source.offset
            );

            for entity in extraction.missing_entities {
                warn!("{}: entity '{}' not found", source.name, entity);
                missing_entities.push(EntityMiss {
                    file: source.name.clone(),
                    entity,
                });
            }

            for (entity, metric, outcome) in extraction.values {
                if outcome.is_not_found() {
                    debug!("{}: {}/{} not found ({:?})", source.name, entity, metric, outcome);
                    metric_misses.push(MetricMiss {
                        file: source.name.clone(),
                        entity,
                        metric,
                        outcome,
                    });
                    continue;
                }

                match outcome.resolve(self.config.missing_policy) {
                    Some(value) => {
                        debug!("{}: {}/{} = {}", source.name, entity, metric, value);
                        let previous = aggregator.record(Observation {
                            entity,
                            metric,
                            period: source.period,
                            value,
                        });
                        if let Some(previous) = previous {
                            debug!("{}: overwrote previous value {}", source.name, previous);
                        }
                    }
                    None => {
                        if let ExtractOutcome::Unparseable(text) = &outcome {
                            warn!(
                                "{}: {}/{} has non-numeric value '{}'",
                                source.name, entity, metric, text
                            );
                        }
                    }
                }
            }

            processed_files.push(source.name.clone());
        }

        let summary = aggregator.summarize(self.config.precision);
        info!(
            "Aggregated {} observations from {} files ({} skipped)",
            aggregator.observation_count(),
            processed_files.len(),
            skipped_files.len()
        );

        Ok(RunOutcome {
            summary,
            processed_files,
            skipped_files,
            metric_misses,
            missing_entities,
        })
    }

    /// 対象ファイル名をファイル名順に列挙する
    ///
    /// シンボリックリンクはリンク先を判定します。読み取れないエントリは
    /// `skipped`に記録され、列挙は継続します。
    fn list_files(&self, skipped: &mut Vec<SkippedFile>) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.config.source_dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    skipped.push(SkippedFile {
                        file: String::new(),
                        reason: format!("unreadable directory entry: {}", e),
                    });
                    continue;
                }
            };
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().map(str::to_string) else {
                let lossy = file_name.to_string_lossy().into_owned();
                if !self.has_source_extension(&lossy) {
                    continue;
                }
                warn!("Skipping non UTF-8 file name: {:?}", file_name);
                skipped.push(SkippedFile {
                    file: lossy,
                    reason: "file name is not valid UTF-8".to_string(),
                });
                continue;
            };
            // Excelのロックファイル
            if name.starts_with("~$") || !self.has_source_extension(&name) {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                // 壊れたシンボリックリンクは記録し、ディレクトリは無視する
                if std::fs::symlink_metadata(&path)
                    .map(|meta| meta.file_type().is_symlink())
                    .unwrap_or(false)
                {
                    warn!("Skipping {}: link target is not a readable file", name);
                    skipped.push(SkippedFile {
                        file: name,
                        reason: "link target is not a readable file".to_string(),
                    });
                }
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn has_source_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.config.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// 並列設定に従って各要素に処理を適用する（結果は入力順）
    fn fan_out<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if !self.config.parallel {
            return items.iter().map(f).collect();
        }

        let mut results: Vec<(usize, R)> = items
            .par_iter()
            .enumerate()
            .map(|(idx, item)| (idx, f(item)))
            .collect();

        // 結果をインデックス順にソート（並列処理の順序を保証）
        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// ワークブックを開き、見出しを解決する
    fn load_sheet(&self, source: &SourceFile) -> Result<LoadedSheet> {
        let layout = &self.config.layout;
        let mut reader = WorkbookReader::open(&source.path)?;
        let mut grid = reader.read_grid(&self.config.sheet_selector)?;
        grid.drop_columns(&layout.drop_columns);

        let label_row = grid
            .row(layout.label_row)
            .ok_or(SheetMetricsError::EmptyHeader {
                row: layout.label_row,
            })?;
        let header = resolve_header(label_row, layout.label_row, &layout.entity_label)?;

        Ok(LoadedSheet {
            source: source.clone(),
            grid,
            header,
        })
    }

    /// 集計対象の指標を確定する
    fn resolve_metrics(&self, sheets: &[LoadedSheet]) -> Vec<String> {
        match &self.config.metrics {
            MetricSelection::Listed(metrics) => metrics.clone(),
            MetricSelection::InferAll => {
                let mut metrics = sheets
                    .first()
                    .map(|sheet| sheet.header.metric_labels())
                    .unwrap_or_default();
                for fixed in &self.config.layout.fixed_columns {
                    if !metrics.contains(&fixed.label) {
                        metrics.push(fixed.label.clone());
                    }
                }
                if let Some(sheet) = sheets.first() {
                    info!(
                        "Inferred {} metrics from {}",
                        metrics.len(),
                        sheet.source.name
                    );
                }
                metrics
            }
        }
    }

    /// 1シートから全科室・全指標の値を抽出する
    fn extract_sheet(&self, sheet: &LoadedSheet, metrics: &[String]) -> FileExtraction {
        let layout = &self.config.layout;
        let extractor = MetricExtractor::new(&sheet.header, layout, sheet.source.offset);

        let mut values = Vec::new();
        let mut missing_entities = Vec::new();
        for entity in &self.config.entities {
            let Some(row) = sheet.grid.find_entity_row(entity, layout.data_start_row) else {
                missing_entities.push(entity.clone());
                continue;
            };
            for metric in metrics {
                let outcome = extractor.extract(&sheet.grid, row, metric);
                values.push((entity.clone(), metric.clone(), outcome));
            }
        }

        FileExtraction {
            values,
            missing_entities,
        }
    }
}
