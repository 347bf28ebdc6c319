use serde::{Deserialize, Serialize};

/// 财务报表单期数据（东方财富 RPT_LICO_FN_CPD 业绩报表）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialPeriod {
    pub report_date: String,    // "2024-09-30"
    pub eps: f64,               // 基本每股收益（元）
    pub bps: f64,               // 每股净资产（元）
    pub revenue: f64,           // 营业总收入（元）
    pub revenue_yoy: f64,       // 营收同比 %
    pub net_profit: f64,        // 归母净利润（元）
    pub net_profit_yoy: f64,    // 净利润同比 %
    pub roe: f64,               // 加权ROE %
    pub gross_margin: f64,      // 销售毛利率 %
    #[serde(default)]
    pub debt_ratio: Option<f64>, // 资产负债率 %
}

/// 单日资金流向（元）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundFlowDay {
    pub date: String,
    pub main_net: f64,       // 主力净流入
    pub small_net: f64,      // 小单净流入（散户）
    pub medium_net: f64,
    pub large_net: f64,
    pub super_large_net: f64,
}

/// 某一交易日的筹码分布快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChipSnapshot {
    pub date: String,
    pub close: f64,
    pub winner_rate: f64,        // 获利比例 0~1
    pub avg_cost: f64,           // 平均成本
    pub cost_90_low: f64,
    pub cost_90_high: f64,
    pub concentration_90: f64,   // 90%筹码集中度
    pub cost_70_low: f64,
    pub cost_70_high: f64,
    pub concentration_70: f64,
}

/// 龙虎榜上榜记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DragonTigerRecord {
    pub date: String,
    pub reason: String,
    pub close_price: f64,
    pub change_pct: f64,
    pub buy_amount: f64,
    pub sell_amount: f64,
    pub net_buy: f64,
}

/// 龙虎榜机构席位汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstitutionSeatSummary {
    pub records_count: usize,
    pub buy_institution_count: u32,
    pub sell_institution_count: u32,
    pub total_buy: f64,
    pub total_sell: f64,
    pub net_buy: f64,
}

/// 龙虎榜数据：空记录表示近期未上榜，属于有效数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DragonTigerData {
    pub records: Vec<DragonTigerRecord>,
    pub institution: Option<InstitutionSeatSummary>,
}

/// 融资融券明细（按日期升序）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarginRecord {
    pub date: String,
    pub margin_balance: f64,  // 融资余额（元）
    pub margin_buy: f64,      // 融资买入额
    pub margin_repay: f64,    // 融资偿还额
    pub short_balance: f64,   // 融券余量（股）
    pub short_sell: f64,      // 融券卖出量
}

/// 北向资金个股持股
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NorthboundHolding {
    pub date: String,
    pub hold_shares: f64,
    pub hold_value: f64,
    pub hold_ratio_float: f64, // 占流通股比 %
    pub change_shares: f64,    // 较上期增减（股）
}

/// 北向资金整体每日成交净买额
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NorthboundFlowDay {
    pub date: String,
    pub net_buy: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NorthboundData {
    /// 个股持股（按日期升序），不在沪深港通标的内时为空
    pub holdings: Vec<NorthboundHolding>,
    /// 北向整体资金，最近的在后
    pub market_flow: Vec<NorthboundFlowDay>,
}

impl NorthboundData {
    /// 区间内个股持股数变化
    pub fn holding_change(&self) -> Option<f64> {
        match (self.holdings.first(), self.holdings.last()) {
            (Some(first), Some(last)) if self.holdings.len() >= 2 => Some(last.hold_shares - first.hold_shares),
            (Some(only), _) if only.change_shares != 0.0 => Some(only.change_shares),
            _ => None,
        }
    }

    /// 近5日北向整体净买额合计
    pub fn recent_flow(&self, days: usize) -> f64 {
        let skip = self.market_flow.len().saturating_sub(days);
        self.market_flow.iter().skip(skip).map(|d| d.net_buy).sum()
    }
}

/// 大宗交易单笔成交
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockTrade {
    pub date: String,
    pub trade_price: f64,
    pub close_price: f64,
    pub premium_rate: f64, // 折溢率 %
    pub volume: f64,
    pub amount: f64,
    pub buyer: String,
    pub seller: String,
}

/// 股东户数统计期
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareholderPeriod {
    pub date: String,
    pub holder_count: u64,
    pub holder_count_prev: u64,
    pub holder_change_pct: f64, // 较上期增减比例 %
    pub avg_hold_shares: f64,
    pub avg_hold_value: f64,
    pub price_change_pct: f64,  // 区间涨跌幅 %
}

/// 机构持仓（季度）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstitutionHolding {
    pub report_date: String,
    pub institution_count: u32,
    pub institution_change: i64, // 较上季机构数变化
    pub hold_ratio: f64,          // 持股占流通股比例 %
    pub hold_ratio_change: f64,
}

/// 机构调研
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchVisit {
    pub date: String,
    pub org_count: u32,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstitutionData {
    pub holding: Option<InstitutionHolding>,
    pub research: Vec<ResearchVisit>,
}

/// 限售解禁计划
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnlockEvent {
    pub date: String,       // "2025-03-18"
    pub share_type: String, // 限售股类型
    pub shares: f64,
    pub market_value: f64,
    pub float_ratio: f64,   // 占流通市值比例 %
}

/// 同行业个股
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndustryPeer {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    pub pe: f64,
    pub pb: f64,
    pub total_market_cap: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndustryData {
    pub industry_name: String,
    pub board_code: String,
    pub peers: Vec<IndustryPeer>,
}

impl IndustryData {
    /// 正市盈率从低到高排序后，`pe` 所处分位（0~100），无有效样本时为 None
    pub fn pe_percentile(&self, pe: f64) -> Option<f64> {
        if pe <= 0.0 {
            return None;
        }
        let valid: Vec<f64> = self.peers.iter().map(|p| p.pe).filter(|v| *v > 0.0).collect();
        if valid.is_empty() {
            return None;
        }
        let below = valid.iter().filter(|v| **v < pe).count();
        Some(below as f64 / valid.len() as f64 * 100.0)
    }

    pub fn median_pe(&self) -> Option<f64> {
        let mut valid: Vec<f64> = self.peers.iter().map(|p| p.pe).filter(|v| *v > 0.0).collect();
        if valid.is_empty() {
            return None;
        }
        valid.sort_by(|a, b| a.total_cmp(b));
        Some(valid[valid.len() / 2])
    }
}

/// 分红送转（按报告期倒序）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DividendRecord {
    pub report_date: String,
    pub plan: String,           // 方案描述，如 "10派308.76元(含税)"
    pub cash_per_10: f64,       // 每10股派现（元）
    pub dividend_yield: f64,    // 股息率 %
    pub progress: String,       // 方案进度
    pub ex_date: String,
}

impl DividendRecord {
    pub fn is_paid(&self) -> bool {
        self.cash_per_10 > 0.0 && self.progress.contains("实施")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(pe: f64) -> IndustryPeer {
        IndustryPeer { pe, ..Default::default() }
    }

    #[test]
    fn test_pe_percentile_ignores_losses() {
        let data = IndustryData {
            industry_name: "白酒".into(),
            board_code: "BK0896".into(),
            peers: vec![peer(-5.0), peer(10.0), peer(20.0), peer(30.0), peer(40.0)],
        };
        assert_eq!(data.pe_percentile(25.0), Some(50.0));
        assert_eq!(data.pe_percentile(5.0), Some(0.0));
        assert_eq!(data.pe_percentile(-1.0), None);
        assert_eq!(data.median_pe(), Some(30.0));
    }

    #[test]
    fn test_northbound_holding_change() {
        let data = NorthboundData {
            holdings: vec![
                NorthboundHolding { hold_shares: 1_000.0, ..Default::default() },
                NorthboundHolding { hold_shares: 1_300.0, ..Default::default() },
            ],
            market_flow: (0..8)
                .map(|i| NorthboundFlowDay { date: format!("d{}", i), net_buy: i as f64 })
                .collect(),
        };
        assert_eq!(data.holding_change(), Some(300.0));
        // 最近5日：3+4+5+6+7
        assert_eq!(data.recent_flow(5), 25.0);
        assert_eq!(NorthboundData::default().holding_change(), None);
    }
}
