use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};

use crate::error::FetchResult;
use crate::models::market_data::{
    BlockTrade, ChipSnapshot, DividendRecord, DragonTigerData, FinancialPeriod, FundFlowDay, IndustryData,
    InstitutionData, MarginRecord, NorthboundData, ShareholderPeriod, UnlockEvent,
};
use crate::models::news::NewsItem;
use crate::models::stock::QuoteBundle;
use crate::models::symbol::Symbol;

/// 一次分析的取数窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    /// 日K根数
    pub lookback_days: u32,
    pub today: NaiveDate,
}

impl FetchWindow {
    pub fn new(lookback_days: u32) -> Self {
        Self::with_today(lookback_days, Local::now().date_naive())
    }

    pub fn with_today(lookback_days: u32, today: NaiveDate) -> Self {
        Self { lookback_days, today }
    }

    /// 往前推 `days` 个自然日，"YYYY-MM-DD"
    pub fn since(&self, days: i64) -> String {
        (self.today - Duration::days(days)).format("%Y-%m-%d").to_string()
    }
}

/// 行情数据源：每类数据一个方法，失败时返回 `FetchError`，调用方把该维度标记为不可用
///
/// 时间序列的顺序约定：
/// - K线、资金流向、两融、北向、筹码按日期升序（最新在后）
/// - 财报、股东户数按报告期降序（最新在前）
///
/// 龙虎榜、大宗交易、限售解禁等事件类数据，区间内无记录时返回空列表而不是错误
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 实时快照 + 日K
    async fn quotes(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<QuoteBundle>;

    /// 最近若干期财报（降序）
    async fn financials(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<FinancialPeriod>>;

    async fn fund_flow(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<FundFlowDay>>;

    async fn news(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<NewsItem>>;

    /// 筹码分布序列
    async fn chip(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<ChipSnapshot>>;

    async fn dragon_tiger(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<DragonTigerData>;

    async fn margin(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<MarginRecord>>;

    async fn northbound(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<NorthboundData>;

    async fn block_trades(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<BlockTrade>>;

    async fn shareholders(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<ShareholderPeriod>>;

    async fn institutions(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<InstitutionData>;

    async fn unlocks(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<UnlockEvent>>;

    async fn industry(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<IndustryData>;

    async fn dividends(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<DividendRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let w = FetchWindow::with_today(250, today);
        assert_eq!(w.since(30), "2024-05-31");
        assert_eq!(w.since(0), "2024-06-30");
        assert_eq!(w.since(366), "2023-06-30");
    }
}
