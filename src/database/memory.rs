use std::{collections::BTreeMap, sync::RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::database::{
    table::{company_inform::Company, daily_price::DailyPrice},
    Store,
};

/// 單元測試用的記憶體儲存，行為與 PostgreSQL 的主鍵覆寫一致。
#[derive(Default)]
pub(crate) struct MemoryStore {
    companies: RwLock<BTreeMap<String, Company>>,
    prices: RwLock<BTreeMap<(String, NaiveDate), DailyPrice>>,
}

impl MemoryStore {
    pub(crate) fn company_count(&self) -> usize {
        self.companies.read().map(|c| c.len()).unwrap_or_default()
    }

    pub(crate) fn companies(&self) -> Vec<Company> {
        self.companies
            .read()
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn price_count(&self) -> usize {
        self.prices.read().map(|p| p.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_companies(&self) -> Result<Vec<Company>> {
        Ok(self.companies())
    }

    async fn max_last_update(&self) -> Result<Option<NaiveDate>> {
        let companies = self
            .companies
            .read()
            .map_err(|why| anyhow!("{:?}", why))?;
        Ok(companies.values().map(|c| c.last_update).max())
    }

    async fn replace_companies(&self, companies: &[Company]) -> Result<u64> {
        let mut map = self
            .companies
            .write()
            .map_err(|why| anyhow!("{:?}", why))?;
        for c in companies {
            map.insert(c.code.clone(), c.clone());
        }

        Ok(companies.len() as u64)
    }

    async fn replace_daily_prices(&self, prices: &[DailyPrice]) -> Result<u64> {
        let mut map = self.prices.write().map_err(|why| anyhow!("{:?}", why))?;
        for p in prices {
            map.insert((p.code.clone(), p.date), p.clone());
        }

        Ok(prices.len() as u64)
    }

    async fn fetch_daily_prices(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>> {
        let map = self.prices.read().map_err(|why| anyhow!("{:?}", why))?;
        Ok(map
            .values()
            .filter(|p| p.code == code && p.date >= start && p.date <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(date: NaiveDate, close: i64) -> DailyPrice {
        DailyPrice {
            code: "005930".to_string(),
            date,
            open: 100,
            high: 120,
            low: 90,
            close,
            volume: 1000,
        }
    }

    #[tokio::test]
    async fn test_replace_same_key_twice_keeps_second() {
        let store = MemoryStore::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        store.replace_daily_prices(&[price(date, 110)]).await.unwrap();
        store.replace_daily_prices(&[price(date, 115)]).await.unwrap();

        let rows = store.fetch_daily_prices("005930", date, date).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].close, 115);
        assert_eq!(store.price_count(), 1);
    }

    #[tokio::test]
    async fn test_max_last_update() {
        let store = MemoryStore::default();
        assert_eq!(store.max_last_update().await.unwrap(), None);

        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        store
            .replace_companies(&[
                Company::new("005930".to_string(), "SamsungElec".to_string(), d1),
                Company::new("000660".to_string(), "SKHynix".to_string(), d2),
            ])
            .await
            .unwrap();

        assert_eq!(store.max_last_update().await.unwrap(), Some(d2));
        assert_eq!(store.company_count(), 2);
    }
}
