use std::time::Duration;
use tokio::time::sleep;

use crate::error::{FetchError, FetchResult};

/// 指数退避重试工具。
/// 仅对可重试错误（超时、限流、5xx、连接错误）进行重试，市场不支持/数据为空/格式错误直接返回。
///
/// # Arguments
/// * `label` - 日志前缀，如数据维度名
/// * `max_retries` - 最大重试次数（不含首次请求，总共最多执行 max_retries + 1 次）
/// * `operation` - 异步操作闭包
pub async fn retry_with_backoff<F, Fut, T>(
    label: &str,
    max_retries: u32,
    operation: F,
) -> FetchResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = FetchResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !e.is_transient() || attempt >= max_retries {
                    return Err(e);
                }
                // 指数退避: 1s, 2s, 4s
                let delay = Duration::from_secs(1 << attempt.min(5));
                log::warn!(
                    "[{}] 请求失败（第 {} 次），{}s 后重试: {}",
                    label,
                    attempt + 1,
                    delay.as_secs(),
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// HTTP 状态码转为数据源错误
pub fn check_status(status: reqwest::StatusCode) -> FetchResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let code = status.as_u16();
    Err(match code {
        429 => FetchError::RateLimited(code),
        c if c >= 500 => FetchError::Server(code),
        _ => FetchError::Network(format!("HTTP {}", code)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_with_backoff("test", 2, || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(FetchError::Server(503))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: FetchResult<()> = retry_with_backoff("test", 3, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Empty("融资融券".into()))
        })
        .await;
        assert!(matches!(result, Err(FetchError::Empty(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: FetchResult<()> = retry_with_backoff("test", 1, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::RateLimited(429))
        })
        .await;
        assert_eq!(result, Err(FetchError::RateLimited(429)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(reqwest::StatusCode::OK).is_ok());
        assert_eq!(check_status(reqwest::StatusCode::TOO_MANY_REQUESTS), Err(FetchError::RateLimited(429)));
        assert_eq!(check_status(reqwest::StatusCode::BAD_GATEWAY), Err(FetchError::Server(502)));
        assert!(matches!(check_status(reqwest::StatusCode::NOT_FOUND), Err(FetchError::Network(_))));
    }
}
