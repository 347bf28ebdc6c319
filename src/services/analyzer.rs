use serde::Serialize;

use super::collector::{self, CollectedData};
use super::judgments;
use super::provider::{FetchWindow, MarketDataProvider};
use super::scoring::{self, MultiFactorEngine};
use super::report::render_narrative;
use super::{chip_analysis, fundamental, technical_indicators};
use crate::error::{FetchError, ResearchError};
use crate::models::dimension::{Dimension, DimensionResult, Judgment};
use crate::models::news::{NewsDigest, NewsItem};
use crate::models::report::{BasicInfo, CompositeReport};
use crate::models::settings::ResearchSettings;
use crate::models::stock::{QuoteBundle, QuoteSnapshot};
use crate::models::symbol::Symbol;

const NEWS_HEADLINES: usize = 5;

/// 单只股票的研究流程：采集 -> 逐维判断 -> 加权评分 -> 风险与预测 -> 报告
pub struct StockAnalyzer<'a> {
    provider: &'a dyn MarketDataProvider,
    settings: &'a ResearchSettings,
}

impl<'a> StockAnalyzer<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider, settings: &'a ResearchSettings) -> Self {
        Self { provider, settings }
    }

    pub async fn analyze(&self, symbol: &Symbol) -> Result<CompositeReport, ResearchError> {
        let window = FetchWindow::new(self.settings.lookback_days);
        let data = collector::collect(self.provider, symbol, &window, &self.settings.provider).await;
        build_report(symbol, &window, data, self.settings)
    }
}

/// 根据采集结果生成报告（不发网络请求）
///
/// 没有任何权重 > 0 的维度可用时返回 `ResearchError::NoData`
pub fn build_report(
    symbol: &Symbol,
    window: &FetchWindow,
    data: CollectedData,
    settings: &ResearchSettings,
) -> Result<CompositeReport, ResearchError> {
    let weights = &settings.weights;
    let quotes = data.quotes.as_ref().ok();
    let snapshot = quotes.and_then(|q| q.snapshot.as_ref());
    let price = quotes.and_then(QuoteBundle::last_price);

    let technical = match &data.quotes {
        Ok(bundle) => technical_indicators::analyze(&bundle.klines)
            .ok_or_else(|| format!("K线不足{}根，无法计算技术指标", technical_indicators::MIN_KLINES)),
        Err(e) => Err(e.to_string()),
    };
    let fundamental = match &data.financials {
        Ok(periods) => fundamental::analyze(periods, snapshot, price).ok_or_else(|| "财务数据不完整".to_string()),
        Err(e) => Err(e.to_string()),
    };
    let chip = match &data.chip {
        Ok(series) => chip_analysis::analyze(series, price, &settings.chip).ok_or_else(|| "筹码数据不足".to_string()),
        Err(e) => Err(e.to_string()),
    };
    let news = data
        .news
        .as_ref()
        .map(|items| NewsData {
            digest: NewsDigest::from_items(items, NEWS_HEADLINES),
            items: items.clone(),
        })
        .map_err(|e| e.to_string());
    let pe = fundamental
        .as_ref()
        .ok()
        .and_then(|f| f.pe)
        .or_else(|| snapshot.map(|s| s.pe_ttm).filter(|v| *v > 0.0));

    let w = |d: Dimension| weights.get(d);
    let results = vec![
        judged(Dimension::Technical, w(Dimension::Technical), technical.as_ref().map_err(String::clone), judgments::judge_technical),
        judged(Dimension::Fundamental, w(Dimension::Fundamental), fundamental.as_ref().map_err(String::clone), judgments::judge_fundamental),
        judged(Dimension::FundFlow, w(Dimension::FundFlow), fetched(&data.fund_flow), |d| judgments::judge_fund_flow(d)),
        judged(Dimension::News, w(Dimension::News), news.as_ref().map_err(String::clone), |n| judgments::judge_news(&n.digest)),
        judged(Dimension::Chip, w(Dimension::Chip), chip.as_ref().map_err(String::clone), judgments::judge_chip),
        judged(Dimension::DragonTiger, w(Dimension::DragonTiger), fetched(&data.dragon_tiger), judgments::judge_dragon_tiger),
        judged(Dimension::Margin, w(Dimension::Margin), fetched(&data.margin), |d| judgments::judge_margin(d)),
        judged(Dimension::Northbound, w(Dimension::Northbound), fetched(&data.northbound), judgments::judge_northbound),
        judged(Dimension::BlockTrade, w(Dimension::BlockTrade), fetched(&data.block_trades), |d| {
            judgments::judge_block_trade(d)
        }),
        judged(Dimension::Shareholder, w(Dimension::Shareholder), fetched(&data.shareholders), |d| {
            judgments::judge_shareholder(d)
        }),
        judged(Dimension::Institution, w(Dimension::Institution), fetched(&data.institutions), judgments::judge_institution),
        judged(Dimension::RestrictedShares, w(Dimension::RestrictedShares), fetched(&data.unlocks), |d| {
            judgments::judge_restricted(d, window.today)
        }),
        judged(Dimension::IndustryCompare, w(Dimension::IndustryCompare), fetched(&data.industry), |d| {
            judgments::judge_industry(d, pe)
        }),
        judged(Dimension::Dividend, w(Dimension::Dividend), fetched(&data.dividends), |d| judgments::judge_dividend(d)),
    ];

    let engine = MultiFactorEngine::new(weights, &settings.scoring);
    let outcome = engine.score(&results)?;
    let risk = scoring::assess_risk(technical.as_ref().ok(), fundamental.as_ref().ok());
    let prediction = scoring::predict(&outcome, &risk, price, &results);

    let basic_info = BasicInfo {
        name: quotes.map(QuoteBundle::name).unwrap_or_default(),
        current_price: price,
        change_pct: snapshot
            .map(QuoteSnapshot::change_percent)
            .or_else(|| quotes.and_then(|q| q.klines.last()).map(|k| k.change_pct)),
        pe_ttm: pe,
        pb: snapshot.map(|s| s.pb).filter(|v| *v > 0.0),
        total_market_cap: snapshot.map(|s| s.total_market_cap).filter(|v| *v > 0.0),
        turnover_rate: snapshot.map(|s| s.turnover_rate),
    };

    let mut report = CompositeReport {
        id: uuid::Uuid::new_v4().to_string(),
        symbol: symbol.clone(),
        analysis_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        basic_info,
        dimensions: results,
        outcome,
        risk,
        prediction,
        narrative: String::new(),
    };
    report.narrative = render_narrative(&report);

    log::info!(
        "[analyzer] {} 分析完成：{:.4} {}（置信度{}）",
        symbol,
        report.outcome.score,
        report.outcome.classification.label(),
        report.outcome.confidence.label()
    );
    Ok(report)
}

/// 新闻维度的展示数据
#[derive(Debug, Serialize)]
struct NewsData {
    digest: NewsDigest,
    items: Vec<NewsItem>,
}

fn fetched<T>(result: &Result<T, FetchError>) -> Result<&T, String> {
    result.as_ref().map_err(|e| e.to_string())
}

/// 可用时序列化数据并给出判断，否则记录不可用原因
fn judged<T: Serialize>(
    dimension: Dimension,
    weight: f64,
    source: Result<&T, String>,
    judge: impl FnOnce(&T) -> Judgment,
) -> DimensionResult {
    match source {
        Ok(data) => match serde_json::to_value(data) {
            Ok(value) => DimensionResult::available(dimension, weight, value, judge(data)),
            Err(e) => DimensionResult::unavailable(dimension, weight, format!("数据序列化失败: {}", e)),
        },
        Err(reason) => {
            log::debug!("[analyzer] {} 不可用: {}", dimension.label(), reason);
            DimensionResult::unavailable(dimension, weight, reason)
        }
    }
}
