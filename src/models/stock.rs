use serde::{Deserialize, Serialize};

/// 个股实时行情快照（东方财富 ulist 接口，腾讯接口兜底）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub code: String,          // "600519"
    pub name: String,
    pub price: f64,            // 最新价
    pub change_pct: f64,       // 涨跌幅 %
    pub change_amount: f64,    // 涨跌额
    pub volume: f64,           // 成交量（手）
    pub amount: f64,           // 成交额（元）
    pub amplitude: f64,        // 振幅 %
    pub turnover_rate: f64,    // 换手率 %
    pub pe_ttm: f64,           // 市盈率(动态)
    pub pb: f64,               // 市净率
    pub total_market_cap: f64, // 总市值（元）
    pub float_market_cap: f64, // 流通市值（元）
    pub volume_ratio: f64,     // 量比
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub pre_close: f64,
    pub pct_5d: f64,           // 5日涨幅 %
    pub pct_20d: f64,          // 20日涨幅 %
    pub main_net_inflow: f64,  // 主力净流入（元）
}

impl QuoteSnapshot {
    /// 涨跌幅：有昨收时按最新价重算
    pub fn change_percent(&self) -> f64 {
        if self.pre_close == 0.0 {
            return self.change_pct;
        }
        (self.price - self.pre_close) / self.pre_close * 100.0
    }
}

/// K线单条数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KlineItem {
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub change_pct: f64,
    #[serde(default)]
    pub turnover_rate: f64,
}

/// 行情类数据：实时快照 + 日K历史
///
/// 快照可能缺失（实时接口失败时用最后一根K线兜底），K线为空时视为该类数据不可用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteBundle {
    pub snapshot: Option<QuoteSnapshot>,
    pub klines: Vec<KlineItem>,
}

impl QuoteBundle {
    /// 当前价：优先实时快照，否则最后收盘价
    pub fn last_price(&self) -> Option<f64> {
        self.snapshot
            .as_ref()
            .map(|s| s.price)
            .filter(|p| *p > 0.0)
            .or_else(|| self.klines.last().map(|k| k.close).filter(|p| *p > 0.0))
    }

    pub fn name(&self) -> String {
        self.snapshot.as_ref().map(|s| s.name.clone()).unwrap_or_default()
    }
}
