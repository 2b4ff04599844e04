use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use sqlx::{postgres::PgQueryResult, PgPool, Postgres, Transaction};

/// 上市公司資料列（`company_inform`）。
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Company {
    /// 六碼股票代號，例︰005930。
    pub code: String,
    /// 公司名稱。
    #[sqlx(rename = "company")]
    pub name: String,
    /// 最後一次由上市公司名單更新的日期。
    pub last_update: NaiveDate,
}

impl Company {
    pub fn new(code: String, name: String, last_update: NaiveDate) -> Self {
        Company {
            code,
            name,
            last_update,
        }
    }

    /// 建立資料表（已存在時略過）。
    pub async fn create_table(pool: &PgPool) -> Result<PgQueryResult> {
        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS company_inform (
    code VARCHAR(20),
    company VARCHAR(40),
    last_update DATE,
    PRIMARY KEY (code)
);
"#,
        )
        .execute(pool)
        .await
        .context("Failed to create table company_inform")
    }

    /// 取得所有公司。
    pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Company>> {
        sqlx::query_as::<_, Company>(
            r#"
SELECT
    code, company, last_update
FROM
    company_inform
ORDER BY code
"#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to Company::fetch_all from database")
    }

    /// 取得最後一次更新的日期，資料表為空時回傳 `None`。
    pub async fn max_last_update(pool: &PgPool) -> Result<Option<NaiveDate>> {
        let (last_update,) =
            sqlx::query_as::<_, (Option<NaiveDate>,)>("SELECT max(last_update) FROM company_inform")
                .fetch_one(pool)
                .await
                .context("Failed to Company::max_last_update from database")?;

        Ok(last_update)
    }

    /// 以主鍵整列覆寫，不存在時新增。
    ///
    /// # Errors
    /// SQL 執行失敗時回傳錯誤，是否回滾由呼叫端決定。
    pub async fn upsert(&self, tx: &mut Transaction<'_, Postgres>) -> Result<PgQueryResult> {
        sqlx::query(
            r#"
INSERT INTO company_inform (code, company, last_update)
VALUES ($1, $2, $3)
ON CONFLICT (code) DO UPDATE SET
    company = EXCLUDED.company,
    last_update = EXCLUDED.last_update;
"#,
        )
        .bind(&self.code)
        .bind(&self.name)
        .bind(self.last_update)
        .execute(&mut **tx)
        .await
        .map_err(|why| {
            anyhow!(
                "Failed to upsert company_inform({}) because: {:?}",
                self.code,
                why
            )
        })
    }
}
