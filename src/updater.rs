use anyhow::Result;

use crate::{
    cache::CompanyCache,
    config,
    crawler::{krx::listing, naver::daily_price},
    database::{table::company_inform::Company, Store},
    logging,
    progress::{LogProgress, Progress},
    util::datetime,
};

/// 依序更新上市公司名單與每日股價。
///
/// 儲存體由呼叫端建立後以參考傳入，更新器本身不持有連線的生命週期。
pub struct DbUpdater<'a> {
    store: &'a dyn Store,
    settings: config::Crawler,
    cache: CompanyCache,
    progress: Box<dyn Progress>,
}

impl<'a> DbUpdater<'a> {
    pub fn new(store: &'a dyn Store, settings: config::Crawler) -> Self {
        Self::with_progress(store, settings, Box::new(LogProgress))
    }

    pub fn with_progress(
        store: &'a dyn Store,
        settings: config::Crawler,
        progress: Box<dyn Progress>,
    ) -> Self {
        DbUpdater {
            store,
            settings,
            cache: CompanyCache::new(),
            progress,
        }
    }

    pub fn cache(&self) -> &CompanyCache {
        &self.cache
    }

    /// 更新上市公司名單，每天最多一次。
    ///
    /// 先以資料庫內容重建快取；`max(last_update)` 早於今天（或沒有資料）時才下載名單，
    /// 並在同一個 transaction 內整批覆寫。名單下載失敗只記錄日誌，不視為錯誤。
    ///
    /// 回傳本次寫入的公司數。
    ///
    /// # Errors
    /// 資料庫讀寫失敗時回傳錯誤，該批資料不會有任何一筆生效。
    pub async fn refresh_companies(&self) -> Result<usize> {
        let today = datetime::today();
        let companies = self.store.fetch_companies().await?;
        self.cache.load(&companies, today);

        let last_update = self.store.max_last_update().await?;
        if last_update.is_some_and(|d| d >= today) {
            return Ok(0);
        }

        let listings = match listing::visit(&self.settings.listing_url).await {
            Ok(listings) => listings,
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to fetch the company listing because {:?}",
                    why
                ));
                return Ok(0);
            }
        };

        if listings.is_empty() {
            logging::warn_file_async("The company listing is empty".to_string());
            return Ok(0);
        }

        let batch: Vec<Company> = listings
            .into_iter()
            .map(|l| Company::new(l.code, l.name, today))
            .collect();

        // 提交成功後才更新快取與輸出進度
        self.store.replace_companies(&batch).await?;
        for (index, company) in batch.iter().enumerate() {
            self.cache.insert(&company.code, &company.name);
            self.progress.company_replaced(index, company);
        }

        self.progress.companies_committed(batch.len());
        logging::info_file_async(format!("company_inform refreshed {} rows", batch.len()));

        Ok(batch.len())
    }

    /// 更新指定股票的每日股價。
    ///
    /// 會先呼叫 [`Self::refresh_companies`]；代號不在名單中或查無股價時不做任何事。
    /// 回傳寫入的股價筆數。
    ///
    /// # Errors
    /// 資料庫讀寫失敗時回傳錯誤，該批股價不會有任何一筆生效。
    pub async fn update_price(&self, code: &str, max_pages: Option<usize>) -> Result<usize> {
        self.refresh_companies().await?;

        let company = match self.cache.name(code) {
            Some(name) => name,
            None => {
                logging::warn_file_async(format!("Code({}) doesn't exist in company_inform", code));
                return Ok(0);
            }
        };

        let prices = match daily_price::visit(
            &self.settings.daily_price_url,
            code,
            &company,
            max_pages,
            self.progress.as_ref(),
        )
        .await
        {
            Some(prices) => prices,
            None => return Ok(0),
        };

        self.store.replace_daily_prices(&prices).await?;
        self.progress.prices_committed(&company, code, prices.len());

        Ok(prices.len())
    }

    /// 命令列使用的入口：更新名單後更新指定股票的股價。
    pub async fn set_stock(&self, code: &str, max_pages: Option<usize>) -> Result<usize> {
        self.update_price(code, max_pages).await
    }
}
