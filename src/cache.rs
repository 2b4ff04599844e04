//! 公司代號與名稱的快取。
//!
//! 由資料庫讀入（read-through），以日為單位失效：`loaded_on` 早於今天時視為過期，
//! 呼叫端須重新從 [`crate::database::Store`] 載入。

use std::sync::RwLock;

use chrono::NaiveDate;
use hashbrown::HashMap;

use crate::database::table::company_inform::Company;

#[derive(Default)]
pub struct CompanyCache {
    /// Key:代號 Value:名稱
    names: RwLock<HashMap<String, String>>,
    /// Key:名稱 Value:代號
    codes: RwLock<HashMap<String, String>>,
    /// 最後一次由資料庫載入或由上市名單更新的日期
    loaded_on: RwLock<Option<NaiveDate>>,
}

impl CompanyCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// 以資料庫內容取代整個快取，名稱重複時以排在前面的代號為準。
    pub fn load(&self, companies: &[Company], today: NaiveDate) {
        if let (Ok(mut names), Ok(mut codes)) = (self.names.write(), self.codes.write()) {
            names.clear();
            codes.clear();
            for c in companies {
                names.insert(c.code.clone(), c.name.clone());
                // 同名時保留第一個代號
                codes
                    .entry(c.name.clone())
                    .or_insert_with(|| c.code.clone());
            }
        }

        self.mark_loaded(today);
    }

    /// 新增或覆寫一間公司；名稱改變時移除舊名稱的對應。
    pub fn insert(&self, code: &str, name: &str) {
        if let (Ok(mut names), Ok(mut codes)) = (self.names.write(), self.codes.write()) {
            if let Some(old_name) = names.insert(code.to_string(), name.to_string()) {
                if old_name != name && codes.get(&old_name).is_some_and(|c| c == code) {
                    codes.remove(&old_name);
                }
            }

            codes
                .entry(name.to_string())
                .or_insert_with(|| code.to_string());
        }
    }

    pub fn mark_loaded(&self, today: NaiveDate) {
        if let Ok(mut loaded_on) = self.loaded_on.write() {
            *loaded_on = Some(today);
        }
    }

    /// 從未載入或載入日期早於 `today` 時為過期。
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        match self.loaded_on.read() {
            Ok(loaded_on) => loaded_on.map_or(true, |d| d < today),
            Err(_) => true,
        }
    }

    /// 依代號取得公司名稱
    pub fn name(&self, code: &str) -> Option<String> {
        self.names.read().ok()?.get(code).cloned()
    }

    /// 代號優先，其次以名稱找代號；都找不到時回傳 `None`。
    pub fn resolve(&self, code_or_name: &str) -> Option<String> {
        if let Ok(names) = self.names.read() {
            if names.contains_key(code_or_name) {
                return Some(code_or_name.to_string());
            }
        }

        self.codes.read().ok()?.get(code_or_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.names.read().map(|n| n.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
