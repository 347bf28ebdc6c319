use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use super::datacenter::{self, DatacenterQuery};
use super::provider::{FetchWindow, MarketDataProvider};
use super::{chip_distribution, history_kline, news_service, stock_data};
use crate::error::{FetchError, FetchResult};
use crate::models::market_data::{
    BlockTrade, ChipSnapshot, DividendRecord, DragonTigerData, FinancialPeriod, FundFlowDay, IndustryData,
    InstitutionData, MarginRecord, NorthboundData, ShareholderPeriod, UnlockEvent,
};
use crate::models::news::NewsItem;
use crate::models::settings::{ChipSettings, ProviderSettings, ResearchSettings};
use crate::models::stock::{KlineItem, QuoteBundle, QuoteSnapshot};
use crate::models::symbol::Symbol;
use crate::utils::encoding::{gb18030_to_utf8, strip_jsonp};
use crate::utils::http::{build_eastmoney_client, build_tencent_client};
use crate::utils::retry::{check_status, retry_with_backoff};

/// 单个响应体上限
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
const FUND_FLOW_DAYS: u32 = 30;
const BOARD_PEERS: u32 = 100;

/// 东方财富数据源，实时行情和日K失败时用腾讯接口兜底
pub struct EastMoneyProvider {
    settings: ProviderSettings,
    chip: ChipSettings,
    client: reqwest::Client,
    tencent: reqwest::Client,
}

impl EastMoneyProvider {
    pub fn new(settings: &ResearchSettings) -> anyhow::Result<Self> {
        Ok(Self {
            settings: settings.provider.clone(),
            chip: settings.chip.clone(),
            client: build_eastmoney_client(&settings.provider)?,
            tencent: build_tencent_client(&settings.provider)?,
        })
    }

    /// 单次 GET，读取完整响应体
    async fn get_once(&self, client: &reqwest::Client, url: &str) -> FetchResult<Vec<u8>> {
        let resp = client.get(url).send().await.map_err(|e| self.request_error(e))?;
        check_status(resp.status())?;

        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.request_error(e))?;
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(FetchError::Malformed("响应体过大".to_string()));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn request_error(&self, e: reqwest::Error) -> FetchError {
        match FetchError::from(e) {
            FetchError::Timeout(_) => FetchError::Timeout(self.settings.fetch_timeout_secs),
            other => other,
        }
    }

    async fn get_bytes(&self, client: &reqwest::Client, label: &str, url: &str) -> FetchResult<Vec<u8>> {
        log::debug!("[{}] GET {}", label, url);
        retry_with_backoff(label, self.settings.max_retries, || async move { self.get_once(client, url).await }).await
    }

    /// 东方财富 JSON / JSONP 接口
    async fn get_json(&self, label: &str, url: &str) -> FetchResult<Value> {
        let bytes = self.get_bytes(&self.client, label, url).await?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(serde_json::from_str(strip_jsonp(&text))?)
    }

    async fn query_rows(&self, label: &str, query: DatacenterQuery) -> FetchResult<Vec<Value>> {
        let url = query.url(&self.settings.datacenter_base);
        let json = self.get_json(label, &url).await?;
        let rows = datacenter::parse_rows(&json)?;
        log::debug!("[{}] {} 返回 {} 行", label, query.report(), rows.len());
        Ok(rows)
    }

    fn mainland_only(symbol: &Symbol, category: &str) -> FetchResult<()> {
        if symbol.market().is_mainland() {
            Ok(())
        } else {
            Err(FetchError::UnsupportedMarket {
                market: symbol.market().display_name().to_string(),
                category: category.to_string(),
            })
        }
    }

    async fn eastmoney_snapshot(&self, symbol: &Symbol) -> FetchResult<QuoteSnapshot> {
        let url = stock_data::ulist_url(&self.settings.push2_base, &self.settings.eastmoney_ut, &symbol.secid());
        let json = self.get_json("quote", &url).await?;
        stock_data::parse_ulist_snapshot(&json)
    }

    async fn tencent_snapshot(&self, symbol: &Symbol) -> FetchResult<QuoteSnapshot> {
        let url = stock_data::tencent_quote_url(&self.settings.tencent_quote_base, &symbol.prefixed());
        let bytes = self.get_bytes(&self.tencent, "quote", &url).await?;
        stock_data::parse_tencent_quote(&gb18030_to_utf8(&bytes))
    }

    async fn snapshot(&self, symbol: &Symbol) -> FetchResult<QuoteSnapshot> {
        match self.eastmoney_snapshot(symbol).await {
            Ok(s) => Ok(s),
            Err(e) => {
                log::warn!("[quote] 东方财富实时行情失败，改用腾讯接口: {}", e);
                self.tencent_snapshot(symbol).await
            }
        }
    }

    async fn klines(&self, symbol: &Symbol, limit: u32) -> FetchResult<Vec<KlineItem>> {
        let url = history_kline::eastmoney_kline_url(
            &self.settings.push2his_base,
            &self.settings.eastmoney_ut,
            &symbol.secid(),
            limit,
        );
        let primary = match self.get_json("kline", &url).await {
            Ok(json) => history_kline::parse_eastmoney_klines(&json),
            Err(e) => Err(e),
        };
        match primary {
            Ok(items) => Ok(items),
            Err(e) => {
                log::warn!("[kline] 东方财富日K失败，改用腾讯接口: {}", e);
                let code = symbol.prefixed();
                let url = history_kline::tencent_kline_url(&self.settings.tencent_kline_base, &code, limit);
                let bytes = self.get_bytes(&self.tencent, "kline", &url).await?;
                let json: Value = serde_json::from_slice(&bytes)?;
                history_kline::parse_tencent_klines(&json, &code)
            }
        }
    }
}

#[async_trait]
impl MarketDataProvider for EastMoneyProvider {
    async fn quotes(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<QuoteBundle> {
        let (snapshot, klines) = tokio::join!(self.snapshot(symbol), self.klines(symbol, window.lookback_days));
        let klines = klines?;
        // 快照失败不影响日K，当前价用最后收盘价兜底
        let snapshot = match snapshot {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!("[quote] {} 实时行情不可用: {}", symbol, e);
                None
            }
        };
        Ok(QuoteBundle { snapshot, klines })
    }

    async fn financials(&self, symbol: &Symbol, _window: &FetchWindow) -> FetchResult<Vec<FinancialPeriod>> {
        let query = DatacenterQuery::new(datacenter::RPT_FINANCIALS, "REPORTDATE")
            .code(symbol.code())
            .page_size(8);
        let periods = datacenter::parse_financials(&self.query_rows("financials", query).await?);
        if periods.is_empty() {
            return Err(FetchError::Empty("财务报表".to_string()));
        }
        Ok(periods)
    }

    async fn fund_flow(&self, symbol: &Symbol, _window: &FetchWindow) -> FetchResult<Vec<FundFlowDay>> {
        let url = history_kline::fund_flow_url(
            &self.settings.push2his_base,
            &self.settings.eastmoney_ut,
            &symbol.secid(),
            FUND_FLOW_DAYS,
        );
        let json = self.get_json("fund_flow", &url).await?;
        history_kline::parse_fund_flow(&json)
    }

    async fn news(&self, symbol: &Symbol, _window: &FetchWindow) -> FetchResult<Vec<NewsItem>> {
        let url = news_service::stock_news_url(&self.settings.search_base, symbol.code(), self.settings.news_limit);
        let json = self.get_json("news", &url).await?;
        Ok(news_service::parse_stock_news(&json))
    }

    async fn chip(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<ChipSnapshot>> {
        let klines = self.klines(symbol, window.lookback_days).await?;
        chip_distribution::compute_series(&klines, self.chip.price_buckets, self.chip.series_len)
    }

    async fn dragon_tiger(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<DragonTigerData> {
        Self::mainland_only(symbol, "龙虎榜")?;
        let since = window.since(90);
        let billboard = DatacenterQuery::new(datacenter::RPT_BILLBOARD, "TRADE_DATE")
            .code(symbol.code())
            .since("TRADE_DATE", &since);
        let org = DatacenterQuery::new(datacenter::RPT_BILLBOARD_ORG, "TRADE_DATE")
            .code(symbol.code())
            .since("TRADE_DATE", &since);

        let (records, org_rows) = tokio::join!(
            self.query_rows("dragon_tiger", billboard),
            self.query_rows("dragon_tiger", org)
        );
        let records = datacenter::parse_billboard(&records?);
        let institution = match org_rows {
            Ok(rows) => datacenter::summarize_institution_seats(&rows),
            Err(e) => {
                log::warn!("[dragon_tiger] 机构席位数据获取失败: {}", e);
                None
            }
        };
        Ok(DragonTigerData { records, institution })
    }

    async fn margin(&self, symbol: &Symbol, _window: &FetchWindow) -> FetchResult<Vec<MarginRecord>> {
        Self::mainland_only(symbol, "融资融券")?;
        let query = DatacenterQuery::new(datacenter::RPT_MARGIN, "DATE")
            .filter(format!("scode=\"{}\"", symbol.code()))
            .page_size(20);
        let records = datacenter::parse_margin(&self.query_rows("margin", query).await?);
        if records.is_empty() {
            return Err(FetchError::Empty("融资融券".to_string()));
        }
        Ok(records)
    }

    async fn northbound(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<NorthboundData> {
        Self::mainland_only(symbol, "北向资金")?;
        let holding = DatacenterQuery::new(datacenter::RPT_NORTH_HOLDING, "TRADE_DATE")
            .code(symbol.code())
            .since("TRADE_DATE", &window.since(30))
            .page_size(30);
        let flow = DatacenterQuery::new(datacenter::RPT_NORTH_FLOW, "TRADE_DATE")
            .filter("MUTUAL_TYPE=\"005\"")
            .page_size(10);

        let (holdings, market_flow) = tokio::join!(
            self.query_rows("northbound", holding),
            self.query_rows("northbound", flow)
        );
        let data = match (holdings, market_flow) {
            (Err(e), Err(_)) => return Err(e),
            (holdings, market_flow) => NorthboundData {
                holdings: holdings.map(|r| datacenter::parse_north_holdings(&r)).unwrap_or_default(),
                market_flow: market_flow.map(|r| datacenter::parse_north_flow(&r)).unwrap_or_default(),
            },
        };
        if data.holdings.is_empty() && data.market_flow.is_empty() {
            return Err(FetchError::Empty("北向资金".to_string()));
        }
        Ok(data)
    }

    async fn block_trades(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<BlockTrade>> {
        Self::mainland_only(symbol, "大宗交易")?;
        let query = DatacenterQuery::new(datacenter::RPT_BLOCK_TRADE, "TRADE_DATE")
            .code(symbol.code())
            .since("TRADE_DATE", &window.since(90));
        Ok(datacenter::parse_block_trades(&self.query_rows("block_trade", query).await?))
    }

    async fn shareholders(&self, symbol: &Symbol, _window: &FetchWindow) -> FetchResult<Vec<ShareholderPeriod>> {
        Self::mainland_only(symbol, "股东户数")?;
        let query = DatacenterQuery::new(datacenter::RPT_HOLDER_NUM, "END_DATE")
            .code(symbol.code())
            .page_size(8);
        let periods = datacenter::parse_shareholders(&self.query_rows("shareholder", query).await?);
        if periods.is_empty() {
            return Err(FetchError::Empty("股东户数".to_string()));
        }
        Ok(periods)
    }

    async fn institutions(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<InstitutionData> {
        Self::mainland_only(symbol, "机构持仓")?;
        let holding = DatacenterQuery::new(datacenter::RPT_ORG_HOLD, "REPORT_DATE")
            .code(symbol.code())
            .filter("ORG_TYPE=\"00\"")
            .page_size(4);
        let survey = DatacenterQuery::new(datacenter::RPT_ORG_SURVEY, "NOTICE_DATE")
            .code(symbol.code())
            .since("NOTICE_DATE", &window.since(180))
            .page_size(20);

        let (holding, survey) = tokio::join!(
            self.query_rows("institution", holding),
            self.query_rows("institution", survey)
        );
        let data = match (holding, survey) {
            (Err(e), Err(_)) => return Err(e),
            (holding, survey) => InstitutionData {
                holding: holding.ok().and_then(|r| datacenter::parse_org_holding(&r)),
                research: survey.map(|r| datacenter::parse_research_visits(&r)).unwrap_or_default(),
            },
        };
        if data.holding.is_none() && data.research.is_empty() {
            return Err(FetchError::Empty("机构持仓".to_string()));
        }
        Ok(data)
    }

    async fn unlocks(&self, symbol: &Symbol, window: &FetchWindow) -> FetchResult<Vec<UnlockEvent>> {
        Self::mainland_only(symbol, "限售解禁")?;
        let query = DatacenterQuery::new(datacenter::RPT_LIFT, "FREE_DATE")
            .code(symbol.code())
            .since("FREE_DATE", &window.since(30))
            .ascending()
            .page_size(20);
        Ok(datacenter::parse_unlocks(&self.query_rows("restricted", query).await?))
    }

    async fn industry(&self, symbol: &Symbol, _window: &FetchWindow) -> FetchResult<IndustryData> {
        let url = stock_data::stock_profile_url(&self.settings.push2_base, &self.settings.eastmoney_ut, &symbol.secid());
        let (industry_name, board_code) = stock_data::parse_industry_board(&self.get_json("industry", &url).await?)?;

        let url = stock_data::board_members_url(
            &self.settings.push2_base,
            &self.settings.eastmoney_ut,
            &board_code,
            BOARD_PEERS,
        );
        let peers = stock_data::parse_board_members(&self.get_json("industry", &url).await?);
        if peers.is_empty() {
            return Err(FetchError::Empty("行业成分股".to_string()));
        }
        Ok(IndustryData {
            industry_name,
            board_code,
            peers,
        })
    }

    async fn dividends(&self, symbol: &Symbol, _window: &FetchWindow) -> FetchResult<Vec<DividendRecord>> {
        Self::mainland_only(symbol, "分红")?;
        let query = DatacenterQuery::new(datacenter::RPT_BONUS, "REPORT_DATE")
            .code(symbol.code())
            .page_size(10);
        Ok(datacenter::parse_dividends(&self.query_rows("dividend", query).await?))
    }
}
