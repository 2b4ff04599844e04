use std::{env, fs, io, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

/// KIND 上場法人目錄下載頁
pub const DEFAULT_LISTING_URL: &str =
    "http://kind.krx.co.kr/corpgeneral/corpList.do?method=download&searchType=13";
/// Naver 金融 日別時勢頁
pub const DEFAULT_DAILY_PRICE_URL: &str = "https://finance.naver.com/item/sise_day.naver";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub postgresql: PostgreSQL,
    #[serde(default)]
    pub crawler: Crawler,
}

const POSTGRESQL_HOST: &str = "POSTGRESQL_HOST";
const POSTGRESQL_PORT: &str = "POSTGRESQL_PORT";
const POSTGRESQL_USER: &str = "POSTGRESQL_USER";
const POSTGRESQL_PASSWORD: &str = "POSTGRESQL_PASSWORD";
const POSTGRESQL_DB: &str = "POSTGRESQL_DB";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct PostgreSQL {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db: String,
}

impl PostgreSQL {
    /// 組出 sqlx 使用的連線字串
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?application_name=krx_crawler",
            self.user, self.password, self.host, self.port, self.db
        )
    }
}

const CRAWLER_LISTING_URL: &str = "CRAWLER_LISTING_URL";
const CRAWLER_DAILY_PRICE_URL: &str = "CRAWLER_DAILY_PRICE_URL";
const CRAWLER_TIMEOUT_SECS: &str = "CRAWLER_TIMEOUT_SECS";
const CRAWLER_USER_AGENT: &str = "CRAWLER_USER_AGENT";

/// 爬蟲的來源網址與 HTTP 設定
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Crawler {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    #[serde(default = "default_daily_price_url")]
    pub daily_price_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Crawler {
    fn default() -> Self {
        Crawler {
            listing_url: default_listing_url(),
            daily_price_url: default_daily_price_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_listing_url() -> String {
    DEFAULT_LISTING_URL.to_string()
}

fn default_daily_price_url() -> String {
    DEFAULT_DAILY_PRICE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| App::get().unwrap_or_else(|_| App::new()));

impl App {
    pub fn new() -> Self {
        //讀取設定檔
        let text_content = read_config_file().unwrap_or_default();

        if text_content.is_empty() {
            return App::from_env();
        }

        //轉成Config 物件
        match serde_json::from_str::<App>(text_content.as_str()) {
            Err(why) => {
                logging::error_file_async(format!(
                    "I can't read the config context because {:?}",
                    why
                ));
                App::from_env()
            }
            Ok(_config) => _config.override_with_env(),
        }
    }

    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::from_env())
    }

    /// 從 env 中讀取設定值，缺少的欄位使用預設值
    fn from_env() -> Self {
        App::default().override_with_env()
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(host) = env::var(POSTGRESQL_HOST) {
            self.postgresql.host = host;
        }

        if let Ok(port) = env::var(POSTGRESQL_PORT) {
            self.postgresql.port = i32::from_str(&port).unwrap_or(5432);
        }

        if self.postgresql.port == 0 {
            self.postgresql.port = 5432;
        }

        if let Ok(user) = env::var(POSTGRESQL_USER) {
            self.postgresql.user = user;
        }

        if let Ok(password) = env::var(POSTGRESQL_PASSWORD) {
            self.postgresql.password = password;
        }

        if let Ok(db) = env::var(POSTGRESQL_DB) {
            self.postgresql.db = db;
        }

        if let Ok(url) = env::var(CRAWLER_LISTING_URL) {
            self.crawler.listing_url = url;
        }

        if let Ok(url) = env::var(CRAWLER_DAILY_PRICE_URL) {
            self.crawler.daily_price_url = url;
        }

        if let Ok(secs) = env::var(CRAWLER_TIMEOUT_SECS) {
            self.crawler.timeout_secs = u64::from_str(&secs).unwrap_or(DEFAULT_TIMEOUT_SECS);
        }

        if let Ok(ua) = env::var(CRAWLER_USER_AGENT) {
            self.crawler.user_agent = ua;
        }

        self
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

/// 讀取預設的設定檔
fn read_config_file() -> Result<String, io::Error> {
    let p = config_path();
    read_text_file(p)
}

/// 回傳指定路徑的文字檔的內容
pub(crate) fn read_text_file(path: PathBuf) -> Result<String, io::Error> {
    fs::read_to_string(path)
}
