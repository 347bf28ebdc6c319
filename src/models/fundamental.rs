use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationLevel {
    Undervalued,
    Fair,
    Overvalued,
}

impl ValuationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ValuationLevel::Undervalued => "低估值",
            ValuationLevel::Fair => "合理估值",
            ValuationLevel::Overvalued => "高估值",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitabilityLevel {
    Strong,
    Moderate,
    Weak,
}

impl ProfitabilityLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ProfitabilityLevel::Strong => "盈利能力强",
            ProfitabilityLevel::Moderate => "盈利能力一般",
            ProfitabilityLevel::Weak => "盈利能力弱",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthLevel {
    High,
    Moderate,
    Low,
}

impl GrowthLevel {
    pub fn label(&self) -> &'static str {
        match self {
            GrowthLevel::High => "高成长",
            GrowthLevel::Moderate => "稳健成长",
            GrowthLevel::Low => "低成长",
        }
    }
}

/// 基本面比率与评级（财报 + 当前价推算）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalAnalysis {
    pub report_date: String,
    pub eps_ttm: Option<f64>,
    pub bps: Option<f64>,
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub roe: Option<f64>,
    pub gross_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub profit_growth: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub valuation: ValuationLevel,
    pub profitability: ProfitabilityLevel,
    pub growth: GrowthLevel,
}
