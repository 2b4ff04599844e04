use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use sqlx::{postgres::PgQueryResult, PgPool, Postgres, Transaction};

/// 每日股價資料列（`daily_price`），主鍵為 (code, date)。
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct DailyPrice {
    pub code: String,
    pub date: NaiveDate,
    /// 開盤價
    pub open: i64,
    /// 最高價
    pub high: i64,
    /// 最低價
    pub low: i64,
    /// 收盤價
    pub close: i64,
    /// 成交量
    pub volume: i64,
}

impl DailyPrice {
    pub async fn create_table(pool: &PgPool) -> Result<PgQueryResult> {
        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS daily_price (
    code VARCHAR(20),
    date DATE,
    open BIGINT,
    high BIGINT,
    low BIGINT,
    close BIGINT,
    volume BIGINT,
    PRIMARY KEY (code, date)
);
"#,
        )
        .execute(pool)
        .await
        .context("Failed to create table daily_price")
    }

    /// 取得指定股票在 [start, end] 區間（含兩端）的股價，依日期遞增。
    pub async fn fetch(
        pool: &PgPool,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>> {
        sqlx::query_as::<_, DailyPrice>(
            r#"
SELECT
    code, date, open, high, low, close, volume
FROM
    daily_price
WHERE
    code = $1 AND date BETWEEN $2 AND $3
ORDER BY date
"#,
        )
        .bind(code)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
        .context(format!(
            "Failed to DailyPrice::fetch({}, {}, {}) from database",
            code, start, end
        ))
    }

    /// 以主鍵整列覆寫，不存在時新增。
    pub async fn upsert(&self, tx: &mut Transaction<'_, Postgres>) -> Result<PgQueryResult> {
        sqlx::query(
            r#"
INSERT INTO daily_price (code, date, open, high, low, close, volume)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (code, date) DO UPDATE SET
    open = EXCLUDED.open,
    high = EXCLUDED.high,
    low = EXCLUDED.low,
    close = EXCLUDED.close,
    volume = EXCLUDED.volume;
"#,
        )
        .bind(&self.code)
        .bind(self.date)
        .bind(self.open)
        .bind(self.high)
        .bind(self.low)
        .bind(self.close)
        .bind(self.volume)
        .execute(&mut **tx)
        .await
        .map_err(|why| {
            anyhow!(
                "Failed to upsert daily_price({}, {}) because: {:?}",
                self.code,
                self.date,
                why
            )
        })
    }
}
