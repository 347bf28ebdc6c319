use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, REFERER, USER_AGENT};

use crate::models::settings::ProviderSettings;

const DESKTOP_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 东方财富行情/数据中心 HTTP client
/// 配置了 qgqp_b_id 时随请求带上 cookie，超时取单维度超时
pub fn build_eastmoney_client(settings: &ProviderSettings) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(REFERER, HeaderValue::from_static("https://quote.eastmoney.com/"));
    if !settings.qgqp_b_id.is_empty() {
        let cookie = format!("qgqp_b_id={}", settings.qgqp_b_id);
        headers.insert(COOKIE, HeaderValue::from_str(&cookie)?);
    }

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(settings.fetch_timeout())
        .gzip(true)
        .build()?;
    Ok(client)
}

/// 腾讯财经 HTTP client（实时行情与K线兜底）
pub fn build_tencent_client(settings: &ProviderSettings) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(REFERER, HeaderValue::from_static("https://gu.qq.com/"));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(settings.fetch_timeout())
        .gzip(true)
        .build()?;
    Ok(client)
}
