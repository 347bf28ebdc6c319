use std::fmt;

use serde::{Deserialize, Serialize};

/// 分析维度，声明顺序即标准顺序（评分汇总、报告输出都按此顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Technical,
    Fundamental,
    FundFlow,
    News,
    Chip,
    DragonTiger,
    Margin,
    Northbound,
    BlockTrade,
    Shareholder,
    Institution,
    RestrictedShares,
    IndustryCompare,
    Dividend,
}

impl Dimension {
    pub const ALL: [Dimension; 14] = [
        Dimension::Technical,
        Dimension::Fundamental,
        Dimension::FundFlow,
        Dimension::News,
        Dimension::Chip,
        Dimension::DragonTiger,
        Dimension::Margin,
        Dimension::Northbound,
        Dimension::BlockTrade,
        Dimension::Shareholder,
        Dimension::Institution,
        Dimension::RestrictedShares,
        Dimension::IndustryCompare,
        Dimension::Dividend,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Technical => "technical",
            Dimension::Fundamental => "fundamental",
            Dimension::FundFlow => "fund_flow",
            Dimension::News => "news",
            Dimension::Chip => "chip",
            Dimension::DragonTiger => "dragon_tiger",
            Dimension::Margin => "margin",
            Dimension::Northbound => "northbound",
            Dimension::BlockTrade => "block_trade",
            Dimension::Shareholder => "shareholder",
            Dimension::Institution => "institution",
            Dimension::RestrictedShares => "restricted_shares",
            Dimension::IndustryCompare => "industry_compare",
            Dimension::Dividend => "dividend",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Technical => "技术面",
            Dimension::Fundamental => "基本面",
            Dimension::FundFlow => "资金流向",
            Dimension::News => "新闻资讯",
            Dimension::Chip => "筹码分布",
            Dimension::DragonTiger => "龙虎榜",
            Dimension::Margin => "融资融券",
            Dimension::Northbound => "北向资金",
            Dimension::BlockTrade => "大宗交易",
            Dimension::Shareholder => "股东户数",
            Dimension::Institution => "机构持仓",
            Dimension::RestrictedShares => "限售解禁",
            Dimension::IndustryCompare => "行业对比",
            Dimension::Dividend => "分红派息",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 方向判断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub fn from_signal(signal: f64) -> Self {
        if signal > 0.0 {
            Direction::Bullish
        } else if signal < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Bullish => "看多",
            Direction::Bearish => "看空",
            Direction::Neutral => "中性",
        }
    }
}

/// 单个评分因子：描述 + 对维度信号的有符号贡献
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub description: String,
    pub score: f64,
}

impl Factor {
    pub fn new(description: impl Into<String>, score: f64) -> Self {
        Self { description: description.into(), score }
    }
}

/// 维度判断结果。`signal` 在 [-1, 1] 之间，乘以维度权重即为对综合评分的贡献
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgment {
    pub signal: f64,
    pub direction: Direction,
    pub factors: Vec<Factor>,
    pub summary: String,
}

impl Judgment {
    /// 由因子列表求和得到信号（截断到 [-1, 1]）
    pub fn from_factors(factors: Vec<Factor>, summary: impl Into<String>) -> Self {
        let signal = factors.iter().map(|f| f.score).sum::<f64>().clamp(-1.0, 1.0);
        Self {
            signal,
            direction: Direction::from_signal(signal),
            factors,
            summary: summary.into(),
        }
    }

    pub fn neutral(summary: impl Into<String>) -> Self {
        Self::from_factors(Vec::new(), summary)
    }
}

/// 维度状态：可用（附原始数据与判断）或不可用（附原因）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DimensionStatus {
    Available {
        data: serde_json::Value,
        judgment: Judgment,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: Dimension,
    pub weight: f64,
    #[serde(flatten)]
    pub status: DimensionStatus,
}

impl DimensionResult {
    pub fn available(dimension: Dimension, weight: f64, data: serde_json::Value, judgment: Judgment) -> Self {
        Self { dimension, weight, status: DimensionStatus::Available { data, judgment } }
    }

    pub fn unavailable(dimension: Dimension, weight: f64, reason: impl Into<String>) -> Self {
        Self { dimension, weight, status: DimensionStatus::Unavailable { reason: reason.into() } }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.status, DimensionStatus::Available { .. })
    }

    pub fn judgment(&self) -> Option<&Judgment> {
        match &self.status {
            DimensionStatus::Available { judgment, .. } => Some(judgment),
            DimensionStatus::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.status {
            DimensionStatus::Unavailable { reason } => Some(reason),
            DimensionStatus::Available { .. } => None,
        }
    }

    /// 对综合评分的贡献：weight × signal，不可用维度贡献 0
    pub fn contribution(&self) -> f64 {
        self.judgment().map(|j| self.weight * j.signal).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let mut shuffled = vec![Dimension::Dividend, Dimension::Chip, Dimension::Technical];
        shuffled.sort();
        assert_eq!(shuffled, vec![Dimension::Technical, Dimension::Chip, Dimension::Dividend]);
        assert_eq!(Dimension::ALL.len(), 14);
    }

    #[test]
    fn test_judgment_signal_clamped() {
        let j = Judgment::from_factors(
            vec![Factor::new("a", 0.8), Factor::new("b", 0.6)],
            "",
        );
        assert_eq!(j.signal, 1.0);
        assert_eq!(j.direction, Direction::Bullish);
        assert_eq!(Judgment::neutral("无").direction, Direction::Neutral);
    }

    #[test]
    fn test_unavailable_contributes_zero() {
        let r = DimensionResult::unavailable(Dimension::Margin, 0.05, "港股不支持");
        assert_eq!(r.contribution(), 0.0);
        assert_eq!(r.unavailable_reason(), Some("港股不支持"));

        let j = Judgment::from_factors(vec![Factor::new("趋势向下", -0.6)], "");
        let r = DimensionResult::available(Dimension::Technical, 0.35, serde_json::Value::Null, j);
        assert!((r.contribution() - (-0.21)).abs() < 1e-12);
    }

    #[test]
    fn test_status_serializes_tagged() {
        let r = DimensionResult::unavailable(Dimension::Northbound, 0.05, "超时");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["dimension"], "northbound");
        assert_eq!(v["status"], "unavailable");
        assert_eq!(v["reason"], "超时");
    }
}
