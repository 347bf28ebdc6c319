//! 各维度数据 → 方向判断。
//!
//! 每个因子给出对维度信号的有符号贡献（以维度权重为 1 计），
//! 合计截断到 [-1, 1]，再由评分器乘以维度权重。

use chrono::NaiveDate;

use crate::models::chip::{BehaviorKind, ChipAnalysis, ChipStatus, TrendDirection};
use crate::models::dimension::{Factor, Judgment};
use crate::models::fundamental::{FundamentalAnalysis, GrowthLevel, ProfitabilityLevel, ValuationLevel};
use crate::models::market_data::{
    BlockTrade, DividendRecord, DragonTigerData, FundFlowDay, IndustryData, InstitutionData, MarginRecord,
    NorthboundData, ShareholderPeriod, UnlockEvent,
};
use crate::models::news::NewsDigest;
use crate::models::technical::{OverallSignal, PriceTrend, TechnicalAnalysis};
use crate::utils::format::{format_amount, format_signed_amount};

const ONE_THIRD: f64 = 1.0 / 3.0;
const CHIP_FACTOR: f64 = 0.25;
// 按技术面权重 0.35 折算为 ±0.20 / ±0.15
const TREND_SHARE: f64 = 4.0 / 7.0;
const OVERALL_SHARE: f64 = 3.0 / 7.0;

pub fn judge_technical(ta: &TechnicalAnalysis) -> Judgment {
    let mut factors = Vec::new();
    match ta.trend {
        PriceTrend::Up => factors.push(Factor::new("技术趋势向上", TREND_SHARE)),
        PriceTrend::Down => factors.push(Factor::new("技术趋势向下", -TREND_SHARE)),
        PriceTrend::Sideways => {}
    }
    match ta.overall_signal {
        OverallSignal::Buy | OverallSignal::StrongBuy => factors.push(Factor::new("技术指标买入信号", OVERALL_SHARE)),
        OverallSignal::Sell | OverallSignal::StrongSell => factors.push(Factor::new("技术指标卖出信号", -OVERALL_SHARE)),
        OverallSignal::Neutral => {}
    }
    let summary = format!("{}，综合信号{}；{}", ta.trend.label(), ta.overall_signal.label(), ta.summary);
    Judgment::from_factors(factors, summary)
}

pub fn judge_fundamental(fa: &FundamentalAnalysis) -> Judgment {
    let mut factors = Vec::new();
    if fa.profitability == ProfitabilityLevel::Strong {
        factors.push(Factor::new("盈利能力强", ONE_THIRD));
    }
    if fa.growth == GrowthLevel::High {
        factors.push(Factor::new("成长性高", ONE_THIRD));
    }
    match fa.valuation {
        ValuationLevel::Undervalued => factors.push(Factor::new("估值偏低", ONE_THIRD)),
        ValuationLevel::Overvalued => factors.push(Factor::new("估值偏高", -ONE_THIRD)),
        ValuationLevel::Fair => {}
    }
    let pe = fa.pe.map(|v| format!("PE {:.1}", v)).unwrap_or_else(|| "PE -".to_string());
    let roe = fa.roe.map(|v| format!("ROE {:.1}%", v)).unwrap_or_else(|| "ROE -".to_string());
    let summary = format!(
        "{}，{}，{}（{}，{}，报告期 {}）",
        fa.valuation.label(),
        fa.profitability.label(),
        fa.growth.label(),
        pe,
        roe,
        fa.report_date
    );
    Judgment::from_factors(factors, summary)
}

/// 近5日主力净流入合计
pub fn judge_fund_flow(days: &[FundFlowDay]) -> Judgment {
    let recent = &days[days.len().saturating_sub(5)..];
    let main: f64 = recent.iter().map(|d| d.main_net).sum();
    let retail: f64 = recent.iter().map(|d| d.small_net).sum();

    let mut factors = Vec::new();
    if main > 0.0 {
        factors.push(Factor::new("主力资金净流入", 1.0));
    } else if main < 0.0 {
        factors.push(Factor::new("主力资金净流出", -1.0));
    }
    let summary = format!(
        "近{}日主力净流入 {}，散户净流入 {}",
        recent.len(),
        format_signed_amount(main),
        format_signed_amount(retail)
    );
    Judgment::from_factors(factors, summary)
}

/// 新闻只做展示，不给方向
pub fn judge_news(digest: &NewsDigest) -> Judgment {
    let summary = match &digest.latest_time {
        Some(t) => format!("近期相关新闻 {} 条，最新 {}", digest.news_count, t),
        None => format!("近期相关新闻 {} 条", digest.news_count),
    };
    Judgment::neutral(summary)
}

pub fn judge_chip(chip: &ChipAnalysis) -> Judgment {
    let mut factors = Vec::new();
    match chip.status {
        ChipStatus::HighlyConcentrated | ChipStatus::Concentrated => {
            factors.push(Factor::new(chip.status.label(), CHIP_FACTOR))
        }
        ChipStatus::Dispersed => factors.push(Factor::new(chip.status.label(), -CHIP_FACTOR)),
        ChipStatus::Neutral => {}
    }
    match chip.concentration_trend {
        TrendDirection::Rising => factors.push(Factor::new("筹码趋于集中", CHIP_FACTOR)),
        TrendDirection::Falling => factors.push(Factor::new("筹码趋于分散", -CHIP_FACTOR)),
        TrendDirection::Flat => {}
    }
    if chip.latest.winner_rate > 0.90 {
        factors.push(Factor::new("获利盘过高，存在抛压", -CHIP_FACTOR));
    }
    // 主力行为只看方向，强弱仅用于描述
    let behavior = match chip.behavior.strength {
        Some(strength) => format!("{}（{}）", chip.behavior.label, strength.label()),
        None => chip.behavior.label.clone(),
    };
    match chip.behavior.kind {
        BehaviorKind::Accumulation => factors.push(Factor::new(behavior, CHIP_FACTOR)),
        BehaviorKind::Distribution => factors.push(Factor::new(behavior, -CHIP_FACTOR)),
        BehaviorKind::Neutral => {}
    }
    Judgment::from_factors(factors, chip.summary.clone())
}

pub fn judge_dragon_tiger(data: &DragonTigerData) -> Judgment {
    let mut factors = Vec::new();
    let mut parts = Vec::new();

    if data.records.is_empty() {
        parts.push("近期未上龙虎榜".to_string());
    } else {
        let net: f64 = data.records.iter().map(|r| r.net_buy).sum();
        parts.push(format!("近期上榜 {} 次，龙虎榜净买入 {}", data.records.len(), format_signed_amount(net)));
    }

    if let Some(inst) = &data.institution {
        if inst.net_buy > 0.0 {
            factors.push(Factor::new("机构席位净买入", 1.0));
        } else if inst.net_buy < 0.0 {
            factors.push(Factor::new("机构席位净卖出", -1.0));
        }
        parts.push(format!(
            "机构买入 {} 家次 / 卖出 {} 家次，净额 {}",
            inst.buy_institution_count,
            inst.sell_institution_count,
            format_signed_amount(inst.net_buy)
        ));
    }
    Judgment::from_factors(factors, parts.join("，"))
}

/// 融资余额：窗口首尾对比（记录按日期升序）
pub fn judge_margin(records: &[MarginRecord]) -> Judgment {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Judgment::neutral("融资融券数据不足");
    };

    let change = last.margin_balance - first.margin_balance;
    let mut factors = Vec::new();
    if records.len() >= 2 {
        if change > 0.0 {
            factors.push(Factor::new("融资余额增加", 1.0));
        } else if change < 0.0 {
            factors.push(Factor::new("融资余额减少", -1.0));
        }
    }

    let pct = if first.margin_balance > 0.0 { change / first.margin_balance * 100.0 } else { 0.0 };
    let summary = format!(
        "融资余额 {}，{}日内变化 {} ({:+.2}%)",
        format_amount(last.margin_balance),
        records.len(),
        format_signed_amount(change),
        pct
    );
    Judgment::from_factors(factors, summary)
}

/// 个股持股变化优先，没有个股数据时看北向整体近5日资金
pub fn judge_northbound(data: &NorthboundData) -> Judgment {
    let mut factors = Vec::new();
    let summary;

    match data.holding_change().filter(|c| *c != 0.0) {
        Some(change) => {
            if change > 0.0 {
                factors.push(Factor::new("北向资金增持", 1.0));
            } else {
                factors.push(Factor::new("北向资金减持", -1.0));
            }
            let ratio = data.holdings.last().map(|h| h.hold_ratio_float).unwrap_or(0.0);
            summary = format!("北向持股变化 {:+.0} 股，占流通股 {:.2}%", change, ratio);
        }
        None => {
            let flow = data.recent_flow(5);
            if flow > 0.0 {
                factors.push(Factor::new("北向资金整体净流入", 1.0));
            } else if flow < 0.0 {
                factors.push(Factor::new("北向资金整体净流出", -1.0));
            }
            summary = format!("个股无北向持股变化，北向整体近5日净买入 {}", format_signed_amount(flow));
        }
    }
    Judgment::from_factors(factors, summary)
}

pub fn judge_block_trade(trades: &[BlockTrade]) -> Judgment {
    if trades.is_empty() {
        return Judgment::neutral("近期无大宗交易");
    }
    let avg_premium = trades.iter().map(|t| t.premium_rate).sum::<f64>() / trades.len() as f64;
    let total: f64 = trades.iter().map(|t| t.amount).sum();

    let mut factors = Vec::new();
    if avg_premium > 0.0 {
        factors.push(Factor::new("大宗交易溢价成交", 1.0));
    } else if avg_premium < -5.0 {
        factors.push(Factor::new("大宗交易大幅折价", -1.0));
    }
    let summary = format!(
        "近期大宗交易 {} 笔，成交 {}，平均折溢价率 {:+.2}%",
        trades.len(),
        format_amount(total),
        avg_premium
    );
    Judgment::from_factors(factors, summary)
}

/// 股东户数：最新一期较上期变化（户数减少=筹码集中）
pub fn judge_shareholder(periods: &[ShareholderPeriod]) -> Judgment {
    let Some(latest) = periods.first() else {
        return Judgment::neutral("股东户数数据不足");
    };
    let change = latest.holder_change_pct;
    let mut factors = Vec::new();
    if change < -3.0 {
        factors.push(Factor::new("股东户数减少，筹码趋于集中", 1.0));
    } else if change > 3.0 {
        factors.push(Factor::new("股东户数增加，筹码趋于分散", -0.6));
    }
    let summary = format!(
        "截至 {} 股东户数 {}，较上期 {:+.2}%",
        latest.date, latest.holder_count, change
    );
    Judgment::from_factors(factors, summary)
}

pub fn judge_institution(data: &InstitutionData) -> Judgment {
    let mut factors = Vec::new();
    let mut parts = Vec::new();

    if let Some(h) = &data.holding {
        if h.institution_change > 0 {
            factors.push(Factor::new("机构家数增加", 1.0));
        } else if h.institution_change < 0 {
            factors.push(Factor::new("机构家数减少", -0.6));
        }
        parts.push(format!(
            "{} 持仓机构 {} 家（{:+}），持股占流通股 {:.2}%",
            h.report_date, h.institution_count, h.institution_change, h.hold_ratio
        ));
    }
    if !data.research.is_empty() {
        let orgs: u32 = data.research.iter().map(|r| r.org_count).sum();
        parts.push(format!("近期机构调研 {} 次，接待 {} 家次", data.research.len(), orgs));
    }
    if parts.is_empty() {
        parts.push("无机构持仓与调研记录".to_string());
    }
    Judgment::from_factors(factors, parts.join("，"))
}

/// 最近一次未来解禁的流通占比
pub fn judge_restricted(events: &[UnlockEvent], today: NaiveDate) -> Judgment {
    let upcoming = events
        .iter()
        .filter_map(|e| parse_date(&e.date).filter(|d| *d > today).map(|d| (d, e)))
        .min_by_key(|(d, _)| *d);

    let Some((date, event)) = upcoming else {
        return Judgment::neutral(if events.is_empty() { "无限售解禁记录" } else { "近期无解禁计划" });
    };

    let mut factors = Vec::new();
    if event.float_ratio > 10.0 {
        factors.push(Factor::new("解禁压力大", -1.0));
    } else if event.float_ratio > 3.0 {
        factors.push(Factor::new("解禁压力中等", -0.4));
    }
    let days = (date - today).num_days();
    let summary = format!(
        "{}（{}天后）解禁 {}，占流通市值 {:.2}%{}",
        event.date,
        days,
        format_amount(event.market_value),
        event.float_ratio,
        if days <= 30 { "，一个月内解禁需注意" } else { "" }
    );
    Judgment::from_factors(factors, summary)
}

pub fn judge_industry(data: &IndustryData, pe: Option<f64>) -> Judgment {
    let percentile = pe.and_then(|pe| data.pe_percentile(pe));
    let mut factors = Vec::new();
    match percentile {
        Some(p) if p <= 25.0 => factors.push(Factor::new("估值处于行业低位", 1.0)),
        Some(p) if p > 75.0 => factors.push(Factor::new("估值处于行业高位", -1.0)),
        _ => {}
    }
    let median = data.median_pe().map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string());
    let summary = match percentile {
        Some(p) => format!(
            "所属行业 {}（{} 家），行业PE中位数 {}，本股PE分位 {:.0}%",
            data.industry_name,
            data.peers.len(),
            median,
            p
        ),
        None => format!("所属行业 {}（{} 家），行业PE中位数 {}", data.industry_name, data.peers.len(), median),
    };
    Judgment::from_factors(factors, summary)
}

/// 分红稳定（八成以上年份实施派现）且股息率 ≥ 3%
pub fn judge_dividend(records: &[DividendRecord]) -> Judgment {
    if records.is_empty() {
        return Judgment::neutral("无分红记录");
    }
    let paid = records.iter().filter(|r| r.is_paid()).count();
    let ratio = paid as f64 / records.len() as f64;
    let latest_yield = records.iter().map(|r| r.dividend_yield).find(|y| *y > 0.0);

    let mut factors = Vec::new();
    if ratio >= 0.8 && latest_yield.is_some_and(|y| y >= 3.0) {
        factors.push(Factor::new("稳定分红且股息率较高", 1.0));
    }
    let stability = if ratio >= 0.8 {
        "稳定分红"
    } else if ratio >= 0.5 {
        "较稳定"
    } else if ratio > 0.0 {
        "偶尔分红"
    } else {
        "不分红"
    };
    let summary = match latest_yield {
        Some(y) => format!("{}（{}/{}期派现），最新股息率 {:.2}%", stability, paid, records.len(), y),
        None => format!("{}（{}/{}期派现）", stability, paid, records.len()),
    };
    Judgment::from_factors(factors, summary)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chip::PressureLevel;
    use crate::models::dimension::Direction;
    use crate::models::market_data::{
        ChipSnapshot, IndustryPeer, InstitutionHolding, InstitutionSeatSummary, NorthboundFlowDay,
    };
    use crate::models::technical::{LatestIndicators, MaAlignment, SupportResistance, VolumePriceRelation};
    use crate::services::chip_analysis::classify_behavior;

    fn technical(trend: PriceTrend, overall_signal: OverallSignal) -> TechnicalAnalysis {
        TechnicalAnalysis {
            current_price: 10.0,
            trend,
            overall_signal,
            ma_alignment: MaAlignment::Tangled,
            volume_price_relation: VolumePriceRelation::Normal,
            latest: LatestIndicators::default(),
            signals: vec![],
            support_resistance: SupportResistance::default(),
            summary: String::new(),
        }
    }

    fn fundamental(valuation: ValuationLevel, profitability: ProfitabilityLevel, growth: GrowthLevel) -> FundamentalAnalysis {
        FundamentalAnalysis {
            report_date: "2024-03-31".into(),
            eps_ttm: None,
            bps: None,
            pe: Some(20.0),
            pb: None,
            roe: Some(15.0),
            gross_margin: None,
            net_margin: None,
            revenue_growth: None,
            profit_growth: None,
            debt_ratio: None,
            valuation,
            profitability,
            growth,
        }
    }

    fn chip(status: ChipStatus, concentration_trend: TrendDirection, winner_rate: f64) -> ChipAnalysis {
        ChipAnalysis {
            latest: ChipSnapshot { winner_rate, ..Default::default() },
            windows: vec![],
            concentration_trend,
            winner_trend: TrendDirection::Flat,
            cost_center_trend: TrendDirection::Flat,
            behavior: classify_behavior(TrendDirection::Flat, TrendDirection::Flat),
            status,
            pressure_level: PressureLevel::Medium,
            support_level: PressureLevel::Medium,
            signals: vec![],
            summary: String::new(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_technical_shares() {
        let up = judge_technical(&technical(PriceTrend::Up, OverallSignal::Neutral));
        assert!(close(up.signal, 4.0 / 7.0));
        assert!(close(up.signal * 0.35, 0.20), "按默认权重折算为 +0.20");

        let sell = judge_technical(&technical(PriceTrend::Sideways, OverallSignal::StrongSell));
        assert!(close(sell.signal * 0.35, -0.15));
        assert_eq!(sell.direction, Direction::Bearish);

        let both = judge_technical(&technical(PriceTrend::Up, OverallSignal::Buy));
        assert!(close(both.signal, 1.0));
        let both = judge_technical(&technical(PriceTrend::Down, OverallSignal::Sell));
        assert!(close(both.signal, -1.0));
        assert!(both.signal >= -1.0);

        let mixed = judge_technical(&technical(PriceTrend::Down, OverallSignal::StrongBuy));
        assert!(close(mixed.signal, -1.0 / 7.0));
        assert_eq!(judge_technical(&technical(PriceTrend::Sideways, OverallSignal::Neutral)).signal, 0.0);
    }

    #[test]
    fn test_fundamental_levels() {
        use GrowthLevel as G;
        use ProfitabilityLevel as P;
        use ValuationLevel as V;

        assert_eq!(judge_fundamental(&fundamental(V::Fair, P::Moderate, G::Moderate)).signal, 0.0);
        assert!(close(judge_fundamental(&fundamental(V::Undervalued, P::Weak, G::Low)).signal, ONE_THIRD));
        assert!(close(judge_fundamental(&fundamental(V::Overvalued, P::Weak, G::Low)).signal, -ONE_THIRD));
        assert!(close(judge_fundamental(&fundamental(V::Fair, P::Strong, G::Low)).signal, ONE_THIRD));
        assert!(close(judge_fundamental(&fundamental(V::Fair, P::Weak, G::High)).signal, ONE_THIRD));
        assert!(close(judge_fundamental(&fundamental(V::Undervalued, P::Strong, G::High)).signal, 1.0));
        // 高估抵消一项优势
        assert!(close(judge_fundamental(&fundamental(V::Overvalued, P::Strong, G::Moderate)).signal, 0.0));
    }

    #[test]
    fn test_chip_factors() {
        let base = chip(ChipStatus::Neutral, TrendDirection::Flat, 0.5);
        assert_eq!(judge_chip(&base).signal, 0.0);

        assert!(close(judge_chip(&chip(ChipStatus::HighlyConcentrated, TrendDirection::Flat, 0.5)).signal, 0.25));
        assert!(close(judge_chip(&chip(ChipStatus::Concentrated, TrendDirection::Flat, 0.5)).signal, 0.25));
        assert!(close(judge_chip(&chip(ChipStatus::Dispersed, TrendDirection::Falling, 0.5)).signal, -0.5));
        assert!(close(judge_chip(&chip(ChipStatus::Neutral, TrendDirection::Flat, 0.95)).signal, -0.25));

        // 成本重心变化只做展示
        let mut moving = base.clone();
        moving.cost_center_trend = TrendDirection::Rising;
        assert_eq!(judge_chip(&moving).signal, 0.0);
    }

    #[test]
    fn test_chip_behavior_is_flat_per_direction() {
        let with = |concentration, profit| {
            let mut c = chip(ChipStatus::Neutral, TrendDirection::Flat, 0.5);
            c.behavior = classify_behavior(concentration, profit);
            judge_chip(&c)
        };
        use TrendDirection::{Falling, Flat, Rising};

        // 强、中吸筹都是 +0.25（筹码维度权重 0.20 下即 +0.05）
        assert!(close(with(Rising, Falling).signal, 0.25));
        assert!(close(with(Rising, Rising).signal, 0.25));
        // 强、弱派发都是 -0.25
        assert!(close(with(Falling, Rising).signal, -0.25));
        assert!(close(with(Falling, Falling).signal, -0.25));
        assert_eq!(with(Flat, Flat).signal, 0.0);
        assert!(with(Rising, Falling).factors[0].description.contains("强"));
    }

    #[test]
    fn test_industry_percentile_bands() {
        let peer = |pe: f64| IndustryPeer { pe, price: 10.0, ..Default::default() };
        let data = IndustryData {
            industry_name: "酿酒行业".into(),
            board_code: "BK0477".into(),
            peers: vec![peer(10.0), peer(20.0), peer(30.0), peer(40.0), peer(-5.0)],
        };
        // 负 PE 不计入样本：20 以下 1/4 = 25%，恰好在低位边界内
        assert_eq!(judge_industry(&data, Some(20.0)).signal, 1.0);
        assert_eq!(judge_industry(&data, Some(10.0)).signal, 1.0);
        assert_eq!(judge_industry(&data, Some(15.0)).signal, 1.0);
        assert_eq!(judge_industry(&data, Some(25.0)).signal, 0.0);
        // 40 以下 3/4 = 75%，不算高位
        assert_eq!(judge_industry(&data, Some(40.0)).signal, 0.0);
        assert_eq!(judge_industry(&data, Some(45.0)).signal, -1.0);
        assert_eq!(judge_industry(&data, None).signal, 0.0);
        assert_eq!(judge_industry(&data, Some(-3.0)).signal, 0.0);
    }

    #[test]
    fn test_fund_flow_uses_last_five_days() {
        let mut days: Vec<FundFlowDay> = (0..3)
            .map(|_| FundFlowDay { main_net: 1e9, ..Default::default() })
            .collect();
        days.extend((0..5).map(|_| FundFlowDay { main_net: -1e7, ..Default::default() }));
        let j = judge_fund_flow(&days);
        assert_eq!(j.signal, -1.0);
        assert_eq!(j.direction, Direction::Bearish);
    }

    #[test]
    fn test_margin_balance_change() {
        let rec = |b: f64| MarginRecord { margin_balance: b, ..Default::default() };
        assert_eq!(judge_margin(&[rec(1e9), rec(0.9e9), rec(1.1e9)]).signal, 1.0);
        assert_eq!(judge_margin(&[rec(1e9), rec(0.8e9)]).signal, -1.0);
        assert_eq!(judge_margin(&[rec(1e9)]).signal, 0.0);
        assert_eq!(judge_margin(&[]).direction, Direction::Neutral);
    }

    #[test]
    fn test_block_trade_premium_bands() {
        let t = |p: f64| BlockTrade { premium_rate: p, amount: 1e7, ..Default::default() };
        assert_eq!(judge_block_trade(&[t(1.0), t(0.5)]).signal, 1.0);
        assert_eq!(judge_block_trade(&[t(-3.0)]).signal, 0.0);
        assert_eq!(judge_block_trade(&[t(-8.0), t(-6.0)]).signal, -1.0);
        assert_eq!(judge_block_trade(&[]).signal, 0.0);
    }

    #[test]
    fn test_shareholder_asymmetric() {
        let p = |pct: f64| ShareholderPeriod { holder_change_pct: pct, ..Default::default() };
        assert_eq!(judge_shareholder(&[p(-5.0)]).signal, 1.0);
        assert_eq!(judge_shareholder(&[p(5.0)]).signal, -0.6);
        assert_eq!(judge_shareholder(&[p(2.0)]).signal, 0.0);
    }

    #[test]
    fn test_institution_and_dragon_tiger() {
        let inst = |change: i64| InstitutionData {
            holding: Some(InstitutionHolding { institution_change: change, ..Default::default() }),
            research: vec![],
        };
        assert_eq!(judge_institution(&inst(3)).signal, 1.0);
        assert_eq!(judge_institution(&inst(-2)).signal, -0.6);
        assert_eq!(judge_institution(&InstitutionData::default()).signal, 0.0);

        let lhb = DragonTigerData {
            records: vec![],
            institution: Some(InstitutionSeatSummary { net_buy: -5e6, ..Default::default() }),
        };
        assert_eq!(judge_dragon_tiger(&lhb).signal, -1.0);
        assert_eq!(judge_dragon_tiger(&DragonTigerData::default()).signal, 0.0);
    }

    #[test]
    fn test_northbound_falls_back_to_market_flow() {
        let data = NorthboundData {
            holdings: vec![],
            market_flow: vec![NorthboundFlowDay { date: "2024-05-10".into(), net_buy: -3e9 }],
        };
        assert_eq!(judge_northbound(&data).signal, -1.0);
    }

    #[test]
    fn test_restricted_uses_nearest_future_unlock() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let ev = |date: &str, ratio: f64| UnlockEvent { date: date.into(), float_ratio: ratio, ..Default::default() };
        let events = vec![ev("2024-03-01", 50.0), ev("2024-12-01", 12.0), ev("2024-07-01", 5.0)];
        let j = judge_restricted(&events, today);
        assert_eq!(j.signal, -0.4, "最近一次是 7 月的 5%");
        assert!(j.summary.contains("30天后"));

        assert_eq!(judge_restricted(&[ev("2024-03-01", 50.0)], today).signal, 0.0);
    }

    #[test]
    fn test_dividend_requires_stability_and_yield() {
        let r = |cash: f64, y: f64| DividendRecord {
            cash_per_10: cash,
            dividend_yield: y,
            progress: "实施分配".into(),
            ..Default::default()
        };
        assert_eq!(judge_dividend(&[r(10.0, 3.5), r(9.0, 3.0), r(8.0, 2.0)]).signal, 1.0);
        assert_eq!(judge_dividend(&[r(10.0, 1.5), r(9.0, 1.0)]).signal, 0.0);
        assert_eq!(judge_dividend(&[r(10.0, 4.0), r(0.0, 0.0)]).signal, 0.0);
    }
}
