use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use super::provider::{FetchWindow, MarketDataProvider};
use crate::error::{FetchError, FetchResult};
use crate::models::dimension::Dimension;
use crate::models::market_data::{
    BlockTrade, ChipSnapshot, DividendRecord, DragonTigerData, FinancialPeriod, FundFlowDay, IndustryData,
    InstitutionData, MarginRecord, NorthboundData, ShareholderPeriod, UnlockEvent,
};
use crate::models::news::NewsItem;
use crate::models::settings::ProviderSettings;
use crate::models::stock::QuoteBundle;
use crate::models::symbol::Symbol;

/// 一次采集的全部结果，各类数据互不影响
#[derive(Debug)]
pub struct CollectedData {
    pub quotes: FetchResult<QuoteBundle>,
    pub financials: FetchResult<Vec<FinancialPeriod>>,
    pub fund_flow: FetchResult<Vec<FundFlowDay>>,
    pub news: FetchResult<Vec<NewsItem>>,
    pub chip: FetchResult<Vec<ChipSnapshot>>,
    pub dragon_tiger: FetchResult<DragonTigerData>,
    pub margin: FetchResult<Vec<MarginRecord>>,
    pub northbound: FetchResult<NorthboundData>,
    pub block_trades: FetchResult<Vec<BlockTrade>>,
    pub shareholders: FetchResult<Vec<ShareholderPeriod>>,
    pub institutions: FetchResult<InstitutionData>,
    pub unlocks: FetchResult<Vec<UnlockEvent>>,
    pub industry: FetchResult<IndustryData>,
    pub dividends: FetchResult<Vec<DividendRecord>>,
}

impl CollectedData {
    /// 获取成功的数据类别数
    pub fn success_count(&self) -> usize {
        [
            self.quotes.is_ok(),
            self.financials.is_ok(),
            self.fund_flow.is_ok(),
            self.news.is_ok(),
            self.chip.is_ok(),
            self.dragon_tiger.is_ok(),
            self.margin.is_ok(),
            self.northbound.is_ok(),
            self.block_trades.is_ok(),
            self.shareholders.is_ok(),
            self.institutions.is_ok(),
            self.unlocks.is_ok(),
            self.industry.is_ok(),
            self.dividends.is_ok(),
        ]
        .iter()
        .filter(|ok| **ok)
        .count()
    }
}

/// 单类数据的时间预算：每次请求 fetch_timeout，加上重试退避 1s/2s/4s
fn dimension_budget(settings: &ProviderSettings) -> Duration {
    let attempts = settings.max_retries + 1;
    let backoff: u64 = (0..settings.max_retries).map(|i| 1u64 << i.min(5)).sum();
    settings.fetch_timeout() * attempts + Duration::from_secs(backoff)
}

/// 并发拉取 14 类数据。每类单独限时，整体不超过 total_timeout，超时的类别记为 `FetchError::Timeout`
pub async fn collect(
    provider: &dyn MarketDataProvider,
    symbol: &Symbol,
    window: &FetchWindow,
    settings: &ProviderSettings,
) -> CollectedData {
    let started = Instant::now();
    let total_deadline = started + settings.total_timeout();
    let deadline = (started + dimension_budget(settings)).min(total_deadline);
    let secs = deadline.duration_since(started).as_secs();

    log::info!("[collect] 开始采集 {}，单类限时 {}s", symbol, secs);

    let (
        quotes,
        financials,
        fund_flow,
        news,
        chip,
        dragon_tiger,
        margin,
        northbound,
        block_trades,
        shareholders,
        institutions,
        unlocks,
        industry,
        dividends,
    ) = tokio::join!(
        bounded(Dimension::Technical, deadline, secs, provider.quotes(symbol, window)),
        bounded(Dimension::Fundamental, deadline, secs, provider.financials(symbol, window)),
        bounded(Dimension::FundFlow, deadline, secs, provider.fund_flow(symbol, window)),
        bounded(Dimension::News, deadline, secs, provider.news(symbol, window)),
        bounded(Dimension::Chip, deadline, secs, provider.chip(symbol, window)),
        bounded(Dimension::DragonTiger, deadline, secs, provider.dragon_tiger(symbol, window)),
        bounded(Dimension::Margin, deadline, secs, provider.margin(symbol, window)),
        bounded(Dimension::Northbound, deadline, secs, provider.northbound(symbol, window)),
        bounded(Dimension::BlockTrade, deadline, secs, provider.block_trades(symbol, window)),
        bounded(Dimension::Shareholder, deadline, secs, provider.shareholders(symbol, window)),
        bounded(Dimension::Institution, deadline, secs, provider.institutions(symbol, window)),
        bounded(Dimension::RestrictedShares, deadline, secs, provider.unlocks(symbol, window)),
        bounded(Dimension::IndustryCompare, deadline, secs, provider.industry(symbol, window)),
        bounded(Dimension::Dividend, deadline, secs, provider.dividends(symbol, window)),
    );

    let data = CollectedData {
        quotes,
        financials,
        fund_flow,
        news,
        chip,
        dragon_tiger,
        margin,
        northbound,
        block_trades,
        shareholders,
        institutions,
        unlocks,
        industry,
        dividends,
    };
    log::info!(
        "[collect] 采集完成：{}/14 类成功，耗时 {}ms",
        data.success_count(),
        started.elapsed().as_millis()
    );
    data
}

async fn bounded<T>(
    dimension: Dimension,
    deadline: Instant,
    secs: u64,
    fetch: impl Future<Output = FetchResult<T>>,
) -> FetchResult<T> {
    match timeout_at(deadline, fetch).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            log::warn!("[{}] 获取{}数据失败: {}", dimension.key(), dimension.label(), e);
            Err(e)
        }
        Err(_) => {
            log::warn!("[{}] 获取{}数据超时（{}s）", dimension.key(), dimension.label(), secs);
            Err(FetchError::Timeout(secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_budget() {
        let settings = ProviderSettings {
            fetch_timeout_secs: 10,
            max_retries: 2,
            ..ProviderSettings::default()
        };
        // 3 次请求 + 1s + 2s 退避
        assert_eq!(dimension_budget(&settings), Duration::from_secs(33));

        let settings = ProviderSettings {
            max_retries: 0,
            ..settings
        };
        assert_eq!(dimension_budget(&settings), Duration::from_secs(10));
    }
}
