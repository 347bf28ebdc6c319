use thiserror::Error;

use crate::models::dimension::Dimension;

/// 单个数据维度的获取失败原因
///
/// 调用方统一把任何 `FetchError` 视为“该维度不可用”，跳过后继续分析。
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("网络请求失败: {0}")]
    Network(String),

    #[error("数据源限流 (HTTP {0})")]
    RateLimited(u16),

    #[error("数据源服务端错误 (HTTP {0})")]
    Server(u16),

    #[error("{market} 市场不支持{category}数据")]
    UnsupportedMarket { market: String, category: String },

    #[error("未获取到{0}数据")]
    Empty(String),

    #[error("响应格式异常: {0}")]
    Malformed(String),

    #[error("请求超时（{0}秒）")]
    Timeout(u64),
}

impl FetchError {
    /// 超时、限流、5xx、连接错误可以重试；市场不支持/数据为空/格式错误重试无意义
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::RateLimited(_) | FetchError::Server(_) | FetchError::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return FetchError::Timeout(0);
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            if code == 429 {
                return FetchError::RateLimited(code);
            }
            if status.is_server_error() {
                return FetchError::Server(code);
            }
        }
        if e.is_decode() {
            return FetchError::Malformed(e.to_string());
        }
        FetchError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}

/// 研究流程级别的错误：这些错误会终止整份报告
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("无效的股票代码: {symbol} ({reason})")]
    InvalidSymbol { symbol: String, reason: String },

    #[error("无可用数据：{} 个评分维度全部获取失败", .skipped.len())]
    NoData { skipped: Vec<(Dimension, String)> },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("报告写入失败: {0}")]
    Io(#[from] std::io::Error),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
