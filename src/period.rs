//! Period Module
//!
//! 集計の時間軸となる「期間」（年月）の解析と書式化を提供するモジュール。
//! ファイル名に埋め込まれた`2024年11月`のような表記、または先頭の
//! `2024.11`・`202411`から期間を読み取ります。

use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetMetricsError};

/// ファイル名中の任意の位置にある`YYYY年M月`
const YEAR_MONTH_PATTERN: &str = r"([0-9]{4})年([0-9]{1,2})月";

/// ファイル名先頭の`YYYY.MM`または`YYYYMM`
const LEADING_NUMERIC_PATTERN: &str = r"^([0-9]{4})(?:\.([0-9]{1,2})|([0-9]{2}))(?:[^0-9]|$)";

static YEAR_MONTH: OnceLock<Option<Regex>> = OnceLock::new();
static LEADING_NUMERIC: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// 期間の粒度
///
/// `Month`の場合は年を捨て、月のみをキーとして集計します（`"01月"`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodGranularity {
    /// 月のみ（デフォルト）
    #[default]
    Month,

    /// 年と月
    YearMonth,
}

/// 集計期間（年月）
///
/// `(year, month)`の辞書順で全順序を持ちます。年を持たない期間は
/// 年を持つ期間より前に並びます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: Option<i32>,
    month: u32,
}

impl Period {
    /// 年月から期間を生成する
    pub fn new(year: i32, month: u32) -> Result<Self> {
        Self::validate(Some(year), month)?;
        Ok(Self {
            year: Some(year),
            month,
        })
    }

    /// 月のみの期間を生成する
    pub fn month_only(month: u32) -> Result<Self> {
        Self::validate(None, month)?;
        Ok(Self { year: None, month })
    }

    fn validate(year: Option<i32>, month: u32) -> Result<()> {
        // 年が無い場合は閏年の影響を受けない任意の年で検証する
        NaiveDate::from_ymd_opt(year.unwrap_or(2000), month, 1)
            .map(|_| ())
            .ok_or_else(|| match year {
                Some(y) => SheetMetricsError::InvalidPeriod(format!("{}年{}月", y, month)),
                None => SheetMetricsError::InvalidPeriod(format!("{}月", month)),
            })
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// ファイル名から期間を抽出する
    ///
    /// 名前中の`YYYY年M月`を先頭から順に探し、最初に妥当な年月となるものを
    /// 採用します。見つからない場合は名前先頭の`YYYY.MM`または`YYYYMM`を
    /// 解釈します。
    ///
    /// ```rust
    /// use sheetmetrics::Period;
    ///
    /// let period = Period::from_file_name("2024年11月绩效.xlsx").unwrap();
    /// assert_eq!(period.year(), Some(2024));
    /// assert_eq!(period.month(), 11);
    /// assert_eq!(
    ///     Period::from_file_name("2024.11临床积分明细.xlsx"),
    ///     Period::new(2024, 11).ok()
    /// );
    /// assert!(Period::from_file_name("summary.xlsx").is_none());
    /// ```
    pub fn from_file_name(name: &str) -> Option<Self> {
        let parse = |year: &str, month: &str| -> Option<Self> {
            Self::new(year.parse().ok()?, month.parse().ok()?).ok()
        };

        if let Some(re) = compiled(&YEAR_MONTH, YEAR_MONTH_PATTERN) {
            let found = re
                .captures_iter(name)
                .find_map(|caps| parse(caps.get(1)?.as_str(), caps.get(2)?.as_str()));
            if found.is_some() {
                return found;
            }
        }

        let caps = compiled(&LEADING_NUMERIC, LEADING_NUMERIC_PATTERN)?.captures(name)?;
        let month = caps.get(2).or_else(|| caps.get(3))?;
        parse(caps.get(1)?.as_str(), month.as_str())
    }

    /// 期間ラベルを解釈する
    ///
    /// 受け付ける形式: `YYYY年MM月`、`MM月`、`YYYY.MM`、`YYYYMM`
    pub fn parse_label(label: &str) -> Result<Self> {
        let label = label.trim();
        let invalid = || SheetMetricsError::InvalidPeriod(label.to_string());

        if label.contains('年') {
            return Self::from_file_name(label).ok_or_else(invalid);
        }

        if let Some(month_text) = label.strip_suffix('月') {
            let month = month_text.parse::<u32>().map_err(|_| invalid())?;
            return Self::month_only(month);
        }

        if let Some((year_text, month_text)) = label.split_once('.') {
            let year = year_text.parse::<i32>().map_err(|_| invalid())?;
            let month = month_text.parse::<u32>().map_err(|_| invalid())?;
            return Self::new(year, month);
        }

        if label.len() == 6 && label.chars().all(|c| c.is_ascii_digit()) {
            let (year_text, month_text) = label.split_at(4);
            let year = year_text.parse::<i32>().map_err(|_| invalid())?;
            let month = month_text.parse::<u32>().map_err(|_| invalid())?;
            return Self::new(year, month);
        }

        Err(invalid())
    }

    /// 指定された粒度に変換する
    pub fn with_granularity(self, granularity: PeriodGranularity) -> Self {
        match granularity {
            PeriodGranularity::Month => Self {
                year: None,
                month: self.month,
            },
            PeriodGranularity::YearMonth => self,
        }
    }

    /// レポートのキーとして使用するラベル（`"01月"`または`"2024年01月"`）
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{}年{:02}月", year, self.month),
            None => write!(f, "{:02}月", self.month),
        }
    }
}
