use std::{collections::BTreeMap, fmt};

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::{
    cache::CompanyCache,
    database::{table::daily_price::DailyPrice, Store},
    logging,
    util::datetime,
};

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D+").expect("valid regex"));

const MIN_YEAR: i64 = 1990;
const MAX_YEAR: i64 = 2200;
const DEFAULT_LOOKBACK_DAYS: i64 = 365;

/// 查詢日期的哪一個部分出錯
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    StartYear,
    StartMonth,
    StartDay,
    EndYear,
    EndMonth,
    EndDay,
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DateField::StartYear => "start_year",
            DateField::StartMonth => "start_month",
            DateField::StartDay => "start_day",
            DateField::EndYear => "end_year",
            DateField::EndMonth => "end_month",
            DateField::EndDay => "end_day",
        };
        f.write_str(name)
    }
}

/// 查詢區間的起點或終點
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

impl Bound {
    fn fields(self) -> [DateField; 3] {
        match self {
            Bound::Start => [DateField::StartYear, DateField::StartMonth, DateField::StartDay],
            Bound::End => [DateField::EndYear, DateField::EndMonth, DateField::EndDay],
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    /// 輸入不是已知的代號，也不是已知的公司名稱
    #[error("Code({0}) doesn't exist.")]
    Resolution(String),
    /// 日期格式錯誤或超出範圍，`value` 為出錯的那一段
    #[error("{field}({value}) is wrong.")]
    DateRange { field: DateField, value: String },
    #[error("Failed to query daily_price because {0:?}")]
    Persistence(#[from] anyhow::Error),
}

/// 通過範圍檢查的年月日，日數不與月份交叉檢查
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl QueryDate {
    /// 以非數字切割後取前三段作為年、月、日並檢查範圍。
    ///
    /// 年份須在 [1990, 2200]、月份 [1, 12]、日 [1, 31]，依序檢查。
    pub fn parse(input: &str, bound: Bound) -> Result<QueryDate, QueryError> {
        let mut tokens: Vec<&str> = NON_DIGITS.split(input).collect();
        if tokens.first() == Some(&"") {
            tokens.remove(0);
        }

        let [year_field, month_field, day_field] = bound.fields();
        let year = component(&tokens, 0, year_field, MIN_YEAR, MAX_YEAR)?;
        let month = component(&tokens, 1, month_field, 1, 12)?;
        let day = component(&tokens, 2, day_field, 1, 31)?;

        Ok(QueryDate {
            year: year as i32,
            month: month as u32,
            day: day as u32,
        })
    }

    /// 轉成實際日期；不存在的日數（例︰2月31日）取該月最後一天。
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        datetime::ymd_clamped(self.year, self.month, self.day)
    }
}

impl fmt::Display for QueryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn component(
    tokens: &[&str],
    index: usize,
    field: DateField,
    min: i64,
    max: i64,
) -> Result<i64, QueryError> {
    let token = tokens.get(index).copied().unwrap_or_default();
    let value = token.parse::<i64>().map_err(|_| QueryError::DateRange {
        field,
        value: token.to_string(),
    })?;

    if value < min || value > max {
        return Err(QueryError::DateRange {
            field,
            value: value.to_string(),
        });
    }

    Ok(value)
}

/// 每日股價查詢
///
/// 建立時由儲存體載入公司名單，之後每天第一次查詢時重新載入。
pub struct MarketDb<'a> {
    store: &'a dyn Store,
    cache: CompanyCache,
}

impl<'a> MarketDb<'a> {
    pub async fn new(store: &'a dyn Store) -> anyhow::Result<MarketDb<'a>> {
        let db = MarketDb {
            store,
            cache: CompanyCache::new(),
        };
        db.reload().await?;
        Ok(db)
    }

    /// 重新由儲存體載入公司名單
    pub async fn reload(&self) -> anyhow::Result<()> {
        let companies = self.store.fetch_companies().await?;
        self.cache.load(&companies, datetime::today());
        Ok(())
    }

    pub fn resolve(&self, code_or_name: &str) -> Result<String, QueryError> {
        self.cache
            .resolve(code_or_name)
            .ok_or_else(|| QueryError::Resolution(code_or_name.to_string()))
    }

    /// 取得指定股票（代號或公司名稱）在日期區間內的每日股價，以日期為鍵、遞增排序。
    ///
    /// `start_date` 預設為 365 天前，`end_date` 預設為今天，兩端皆包含。
    pub async fn get_daily_price(
        &self,
        code_or_name: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<BTreeMap<NaiveDate, DailyPrice>, QueryError> {
        let today = datetime::today();
        let start = resolve_date(
            start_date,
            Bound::Start,
            today - Duration::days(DEFAULT_LOOKBACK_DAYS),
        )?;
        let end = resolve_date(end_date, Bound::End, today)?;

        if self.cache.is_stale(today) {
            self.reload().await?;
        }

        let code = self.resolve(code_or_name)?;
        let rows = self.store.fetch_daily_prices(&code, start, end).await?;

        Ok(rows.into_iter().map(|row| (row.date, row)).collect())
    }
}

fn resolve_date(
    input: Option<&str>,
    bound: Bound,
    default: NaiveDate,
) -> Result<NaiveDate, QueryError> {
    let input = match input.map(str::trim).filter(|s| !s.is_empty()) {
        Some(input) => input,
        None => {
            let name = match bound {
                Bound::Start => "start_date",
                Bound::End => "end_date",
            };
            logging::info_file_async(format!(
                "{} is initialized to '{}'",
                name,
                default.format("%Y-%m-%d")
            ));
            return Ok(default);
        }
    };

    let date = QueryDate::parse(input, bound)?;
    date.to_naive_date().ok_or_else(|| QueryError::DateRange {
        field: bound.fields()[2],
        value: date.day.to_string(),
    })
}
