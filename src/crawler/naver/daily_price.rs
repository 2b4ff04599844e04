use std::fmt;

use anyhow::{anyhow, Result};
use concat_string::concat_string;
use scraper::Html;

use crate::{
    database::table::daily_price::DailyPrice,
    logging,
    progress::Progress,
    util::{self, datetime, http::element, text},
};

/// 日別時勢表格
const TABLE_SELECTOR: &str = "table.type2";
/// 分頁列最後一頁的連結
const LAST_PAGE_SELECTOR: &str = "td.pgRR > a";

const DATE_HEADER: &str = "날짜";
const CLOSE_HEADER: &str = "종가";
const OPEN_HEADER: &str = "시가";
const HIGH_HEADER: &str = "고가";
const LOW_HEADER: &str = "저가";
const VOLUME_HEADER: &str = "거래량";

/// 表格中一列尚未轉型的文字
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDailyPrice {
    pub date: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
}

/// 資料列被捨棄的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 欄位不存在或為空白
    MissingField(&'static str),
    /// 數值欄位無法轉成整數
    InvalidNumber { field: &'static str, text: String },
    /// 日期無法解析
    InvalidDate(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing {}", field),
            SkipReason::InvalidNumber { field, text } => {
                write!(f, "invalid number {}='{}'", field, text)
            }
            SkipReason::InvalidDate(text) => write!(f, "invalid date '{}'", text),
        }
    }
}

impl RawDailyPrice {
    /// 轉成具型別的每日股價，任一欄位缺漏或無法解析即捨棄整列。
    pub fn normalize(&self, code: &str) -> Result<DailyPrice, SkipReason> {
        let date_text = required("date", &self.date)?;
        let date = datetime::parse_dotted_date(date_text)
            .ok_or_else(|| SkipReason::InvalidDate(date_text.to_string()))?;

        Ok(DailyPrice {
            code: code.to_string(),
            date,
            open: number("open", &self.open)?,
            high: number("high", &self.high)?,
            low: number("low", &self.low)?,
            close: number("close", &self.close)?,
            volume: number("volume", &self.volume)?,
        })
    }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, SkipReason> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SkipReason::MissingField(field)),
    }
}

fn number(field: &'static str, value: &Option<String>) -> Result<i64, SkipReason> {
    let v = required(field, value)?;
    text::parse_i64(v, None).map_err(|_| SkipReason::InvalidNumber {
        field,
        text: v.to_string(),
    })
}

/// 表格標題對應到的欄位位置
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Columns> {
        let find = |title: &str| {
            header
                .iter()
                .position(|h| h == title)
                .ok_or_else(|| anyhow!("The column '{}' not found in the daily price table", title))
        };

        Ok(Columns {
            date: find(DATE_HEADER)?,
            open: find(OPEN_HEADER)?,
            high: find(HIGH_HEADER)?,
            low: find(LOW_HEADER)?,
            close: find(CLOSE_HEADER)?,
            volume: find(VOLUME_HEADER)?,
        })
    }

    fn raw(&self, cells: &[String]) -> RawDailyPrice {
        let cell = |i: usize| cells.get(i).cloned();
        RawDailyPrice {
            date: cell(self.date),
            open: cell(self.open),
            high: cell(self.high),
            low: cell(self.low),
            close: cell(self.close),
            volume: cell(self.volume),
        }
    }
}

/// 取得分頁列中的最後一頁，沒有分頁列時回傳 `None`
pub(crate) fn parse_last_page(html: &str) -> Result<Option<usize>> {
    let document = Html::parse_document(html);
    let href = match element::attribute_value(&document, LAST_PAGE_SELECTOR, "href") {
        Some(href) => href,
        None => return Ok(None),
    };

    let page = href
        .rsplit('=')
        .next()
        .and_then(|p| p.trim().parse::<usize>().ok())
        .ok_or_else(|| anyhow!("Failed to parse the last page from '{}'", href))?;

    Ok(Some(page))
}

/// 解析單一頁的日別時勢表格，回傳有效資料列與被捨棄的原因
pub(crate) fn parse_page(html: &str, code: &str) -> Result<(Vec<DailyPrice>, Vec<SkipReason>)> {
    let document = Html::parse_document(html);
    let rows = element::parse_table(&document, TABLE_SELECTOR)?;
    let header = rows
        .first()
        .ok_or_else(|| anyhow!("The daily price table is empty"))?;
    let columns = Columns::from_header(header)?;

    let mut prices = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    for cells in rows.iter().skip(1) {
        match columns.raw(cells).normalize(code) {
            Ok(price) => prices.push(price),
            Err(reason) => skipped.push(reason),
        }
    }

    Ok((prices, skipped))
}

fn page_url(base_url: &str, code: &str, page: Option<usize>) -> String {
    match page {
        Some(page) => concat_string!(base_url, "?code=", code, "&page=", page.to_string()),
        None => concat_string!(base_url, "?code=", code),
    }
}

/// 下載指定股票的日別時勢
///
/// 先讀第一頁找出最後一頁，再依序下載 1..=min(max_pages, 最後一頁)；
/// `max_pages` 未指定或為 0 時下載到最後一頁。
/// 沒有分頁列（查無資料）或過程中任何錯誤都回傳 `None`，不保留已下載的部分。
pub async fn visit(
    base_url: &str,
    code: &str,
    company: &str,
    max_pages: Option<usize>,
    progress: &dyn Progress,
) -> Option<Vec<DailyPrice>> {
    match fetch(base_url, code, company, max_pages, progress).await {
        Ok(prices) => prices,
        Err(why) => {
            logging::error_file_async(format!(
                "Failed to fetch daily price of {} ({}) because {:?}",
                company, code, why
            ));
            None
        }
    }
}

async fn fetch(
    base_url: &str,
    code: &str,
    company: &str,
    max_pages: Option<usize>,
    progress: &dyn Progress,
) -> Result<Option<Vec<DailyPrice>>> {
    let first = util::http::get_use_euc_kr(&page_url(base_url, code, None)).await?;
    let last_page = match parse_last_page(&first)? {
        Some(p) => p,
        None => {
            logging::info_file_async(format!(
                "{} ({}) has no pagination, skip daily price",
                company, code
            ));
            return Ok(None);
        }
    };

    // 0 視同未指定
    let pages = match max_pages {
        Some(max) if max > 0 => max.min(last_page),
        _ => last_page,
    };

    let mut prices = Vec::new();
    for page in 1..=pages {
        let html = util::http::get_use_euc_kr(&page_url(base_url, code, Some(page))).await?;
        let (rows, skipped) = parse_page(&html, code)?;
        if !skipped.is_empty() {
            logging::debug_file_async(format!(
                "{} ({}) page {} skipped {} rows: {}",
                company,
                code,
                page,
                skipped.len(),
                skipped
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        prices.extend(rows);
        progress.page_fetched(company, code, page, pages);
    }

    Ok(Some(prices))
}
