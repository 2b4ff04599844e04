use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

use crate::{
    database::table::{company_inform::Company, daily_price::DailyPrice},
    logging,
};

#[cfg(test)]
pub(crate) mod memory;
pub mod table;

/// 更新流程與查詢流程所需的儲存介面。
///
/// 兩張表皆採主鍵整列覆寫（upsert），批次寫入要嘛全部成功，要嘛全部不生效。
#[async_trait]
pub trait Store: Send + Sync {
    /// 取得所有公司。
    async fn fetch_companies(&self) -> Result<Vec<Company>>;

    /// 取得 `company_inform.last_update` 的最大值，沒有資料時為 `None`。
    async fn max_last_update(&self) -> Result<Option<NaiveDate>>;

    /// 批次覆寫公司資料，回傳寫入的筆數。
    async fn replace_companies(&self, companies: &[Company]) -> Result<u64>;

    /// 批次覆寫每日股價，回傳寫入的筆數。
    async fn replace_daily_prices(&self, prices: &[DailyPrice]) -> Result<u64>;

    /// 取得指定股票在 [start, end] 區間的股價，依日期遞增。
    async fn fetch_daily_prices(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>>;
}

/// PostgreSQL 連線池封裝。
///
/// 由呼叫端建立一次後以參考傳入更新與查詢流程；結束時呼叫 [`PostgresSQL::close`]。
pub struct PostgresSQL {
    /// SQLx PostgreSQL 連線池實例。
    pub pool: PgPool,
}

impl PostgresSQL {
    /// 建立連線並確保資料表存在。
    ///
    /// 整個流程是循序的，連線池只保留一條連線。
    ///
    /// # Errors
    /// 當連線或建立資料表失敗時回傳錯誤。
    pub async fn open(database_url: &str) -> Result<PostgresSQL> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|why| anyhow!("Failed to connect to PostgreSQL because {:?}", why))?;
        let db = Self { pool };
        db.create_tables().await?;

        Ok(db)
    }

    /// 建立 `company_inform`、`daily_price`（已存在時略過）。
    pub async fn create_tables(&self) -> Result<()> {
        Company::create_table(self.pool()).await?;
        DailyPrice::create_table(self.pool()).await?;
        Ok(())
    }

    /// 取得連線池參考。
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 從目前連線池建立一筆 transaction。
    ///
    /// # Errors
    /// 當 `BEGIN` 失敗時回傳錯誤。
    pub async fn tx(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool().begin().await?)
    }

    /// 關閉連線池，等待使用中的連線歸還。
    pub async fn close(&self) {
        self.pool.close().await;
        logging::info_file_async("PostgreSQL pool closed".to_string());
    }
}

#[async_trait]
impl Store for PostgresSQL {
    async fn fetch_companies(&self) -> Result<Vec<Company>> {
        Company::fetch_all(self.pool()).await
    }

    async fn max_last_update(&self) -> Result<Option<NaiveDate>> {
        Company::max_last_update(self.pool()).await
    }

    async fn replace_companies(&self, companies: &[Company]) -> Result<u64> {
        let mut tx = self.tx().await?;
        let mut rows_affected = 0;
        for company in companies {
            match company.upsert(&mut tx).await {
                Ok(r) => rows_affected += r.rows_affected(),
                Err(why) => {
                    tx.rollback().await?;
                    return Err(why);
                }
            }
        }

        tx.commit().await?;
        Ok(rows_affected)
    }

    async fn replace_daily_prices(&self, prices: &[DailyPrice]) -> Result<u64> {
        let mut tx = self.tx().await?;
        let mut rows_affected = 0;
        for price in prices {
            match price.upsert(&mut tx).await {
                Ok(r) => rows_affected += r.rows_affected(),
                Err(why) => {
                    tx.rollback().await?;
                    return Err(why);
                }
            }
        }

        tx.commit().await?;
        Ok(rows_affected)
    }

    async fn fetch_daily_prices(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>> {
        DailyPrice::fetch(self.pool(), code, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use crate::config;

    use super::*;

    #[tokio::test]
    #[ignore]
    async fn test_open_and_query() {
        dotenv::dotenv().ok();
        let db = PostgresSQL::open(&config::SETTINGS.postgresql.url())
            .await
            .unwrap();
        // 重複建立資料表不應失敗
        db.create_tables().await.unwrap();

        let companies = db.fetch_companies().await.unwrap();
        let last_update = db.max_last_update().await.unwrap();
        logging::debug_file_async(format!(
            "companies: {} last_update: {:?}",
            companies.len(),
            last_update
        ));

        db.close().await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_replace_companies_rolls_back_whole_batch() {
        dotenv::dotenv().ok();
        let db = PostgresSQL::open(&config::SETTINGS.postgresql.url())
            .await
            .unwrap();
        let today = crate::util::datetime::today();
        // company 欄位為 VARCHAR(40)，第二筆會寫入失敗
        let batch = vec![
            Company::new("ZZ0001".to_string(), "first".to_string(), today),
            Company::new("ZZ0002".to_string(), "x".repeat(41), today),
            Company::new("ZZ0003".to_string(), "third".to_string(), today),
        ];

        assert!(db.replace_companies(&batch).await.is_err());

        let (visible,) = sqlx::query_as::<_, (i64,)>(
            "SELECT count(*) FROM company_inform WHERE code IN ('ZZ0001', 'ZZ0002', 'ZZ0003')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(visible, 0);

        db.close().await;
    }
}
