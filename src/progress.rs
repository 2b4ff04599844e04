use crate::{database::table::company_inform::Company, logging, util::datetime};

/// 更新流程的進度回報。
///
/// 每抓完一頁、每寫一筆公司資料、每提交一批資料各呼叫一次。
pub trait Progress: Send + Sync {
    /// 股價頁下載完成，`page` 從 1 開始。
    fn page_fetched(&self, company: &str, code: &str, page: usize, pages: usize);

    /// 公司資料加入本次批次，`index` 從 0 開始。
    fn company_replaced(&self, index: usize, company: &Company);

    /// 公司資料批次已提交。
    fn companies_committed(&self, rows: usize);

    /// 股價批次已提交。
    fn prices_committed(&self, company: &str, code: &str, rows: usize);
}

/// 將進度同時輸出到 console 與 info 日誌檔。
pub struct LogProgress;

impl LogProgress {
    fn emit(&self, line: String) {
        logging::info_file_async(line.clone());
        println!("{}", line);
    }
}

impl Progress for LogProgress {
    fn page_fetched(&self, company: &str, code: &str, page: usize, pages: usize) {
        self.emit(format!(
            "[{}] {} ({}) : {:04}/{:04} pages are downloading...",
            datetime::now_minute(),
            company,
            code,
            page,
            pages
        ));
    }

    fn company_replaced(&self, index: usize, company: &Company) {
        self.emit(format!(
            "[{}] {:04} REPLACE INTO company_inform VALUES ('{}', '{}', '{}')",
            datetime::now_minute(),
            index,
            company.code,
            company.name,
            company.last_update
        ));
    }

    fn companies_committed(&self, rows: usize) {
        self.emit(format!(
            "[{}] {} rows > REPLACE INTO company_inform [OK]",
            datetime::now_minute(),
            rows
        ));
    }

    fn prices_committed(&self, company: &str, code: &str, rows: usize) {
        self.emit(format!(
            "[{}] {} ({}) : {} rows > REPLACE INTO daily_price [OK]",
            datetime::now_minute(),
            company,
            code,
            rows
        ));
    }
}

#[cfg(test)]
pub(crate) mod recorder {
    use std::sync::Mutex;

    use super::*;

    /// 記錄所有進度事件，供測試驗證順序與次數。
    #[derive(Default)]
    pub(crate) struct RecordingProgress {
        pub(crate) events: Mutex<Vec<String>>,
    }

    impl RecordingProgress {
        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        fn push(&self, event: String) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }

    impl Progress for RecordingProgress {
        fn page_fetched(&self, _company: &str, code: &str, page: usize, pages: usize) {
            self.push(format!("page {} {}/{}", code, page, pages));
        }

        fn company_replaced(&self, index: usize, company: &Company) {
            self.push(format!("company {} {}", index, company.code));
        }

        fn companies_committed(&self, rows: usize) {
            self.push(format!("companies {}", rows));
        }

        fn prices_committed(&self, _company: &str, code: &str, rows: usize) {
            self.push(format!("prices {} {}", code, rows));
        }
    }
}
