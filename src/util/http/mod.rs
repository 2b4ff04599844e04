use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{Client, Method, Response};

use crate::{config, logging::Logger, util};

pub mod element;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// An asynchronous trait that provides a method to force convert a reqwest::Response body
/// from EUC-KR encoding to UTF-8 encoding.
#[async_trait]
pub trait TextForceEucKr {
    /// Converts the body of a reqwest::Response from EUC-KR encoding to UTF-8 encoding.
    async fn text_force_euc_kr(self) -> Result<String>;
}

#[async_trait]
impl TextForceEucKr for Response {
    async fn text_force_euc_kr(self) -> Result<String> {
        Ok(util::text::euc_kr_2_utf8(self.bytes().await?.as_ref()))
    }
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
///
/// 連線與整體請求皆有 timeout，遠端無回應時不會卡住整個流程。
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        // 已安裝過時會回傳 Err，可忽略
        let _ = rustls::crypto::ring::default_provider().install_default();
        let settings = &config::SETTINGS.crawler;

        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .referer(true)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// 等待 http 日誌寫入檔案；尚未發出任何請求時不做事
pub fn flush_log() {
    if let Some(logger) = Lazy::get(&LOGGER) {
        logger.flush();
    }
}

/// Performs an HTTP GET request and returns the response as text.
///
/// The charset is taken from the `Content-Type` header.
pub async fn get(url: &str) -> Result<String> {
    send(Method::GET, url)
        .await?
        .text()
        .await
        .map_err(|e| anyhow!("Error parsing response text: {:?}", e))
}

/// Performs an HTTP GET request and returns the body decoded as EUC-KR.
pub async fn get_use_euc_kr(url: &str) -> Result<String> {
    send(Method::GET, url)
        .await?
        .text_force_euc_kr()
        .await
        .map_err(|e| anyhow!("Error parsing response text use EUC-KR: {:?}", e))
}

/// Sends one HTTP request and fails on transport errors or non-success status codes.
///
/// 不重試，呼叫端自行決定失敗後的處理方式。
async fn send(method: Method, url: &str) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let start = Instant::now();
    let res = client.request(method, url).send().await;
    let elapsed = start.elapsed().as_millis();

    match res.and_then(|r| r.error_for_status()) {
        Ok(response) => {
            LOGGER.info(format!("{} {} ms", visit_log, elapsed));
            Ok(response)
        }
        Err(why) => {
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(anyhow!("Failed to send request to {} because {:?}", url, why))
        }
    }
}

#[cfg(test)]
mod tests {
    use encoding_rs::EUC_KR;

    use super::*;

    #[tokio::test]
    async fn test_get() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/hello")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<p>hello</p>")
            .create_async()
            .await;

        let text = get(&format!("{}/hello", server.url())).await.unwrap();
        assert_eq!(text, "<p>hello</p>");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_use_euc_kr() {
        let mut server = mockito::Server::new_async().await;
        let (body, _, _) = EUC_KR.encode("<td>삼성전자</td>");
        let _m = server
            .mock("GET", "/euc")
            .with_status(200)
            .with_body(body.into_owned())
            .create_async()
            .await;

        let text = get_use_euc_kr(&format!("{}/euc", server.url()))
            .await
            .unwrap();
        assert_eq!(text, "<td>삼성전자</td>");
    }

    #[tokio::test]
    async fn test_get_fails_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(500)
            .create_async()
            .await;

        assert!(get(&format!("{}/missing", server.url())).await.is_err());
    }
}
