use serde::{Deserialize, Serialize};

use super::dimension::{Dimension, DimensionResult};
use super::symbol::Symbol;

/// 综合评分分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Bullish,
    Bearish,
    Neutral,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Bullish => "看多",
            Classification::Bearish => "看空",
            Classification::Neutral => "中性",
        }
    }

    pub fn trend_label(&self) -> &'static str {
        match self {
            Classification::Bullish => "上涨",
            Classification::Bearish => "下跌",
            Classification::Neutral => "震荡",
        }
    }
}

/// 数据完整度带来的置信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "高",
            Confidence::Medium => "中",
            Confidence::Low => "低",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "低",
            RiskLevel::Medium => "中等",
            RiskLevel::High => "高",
        }
    }
}

/// 风险评估：各子项缺数据时为 None
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub volatility_risk: Option<RiskLevel>,
    pub valuation_risk: Option<RiskLevel>,
    pub trend_risk: Option<RiskLevel>,
    pub overall_risk: RiskLevel,
}

/// 加权评分结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: f64,
    pub classification: Classification,
    pub confidence: Confidence,
    /// 已纳入评分的维度（权重 > 0 且数据可用）
    pub included: Vec<Dimension>,
    /// 被跳过的维度及原因
    pub skipped: Vec<SkippedDimension>,
    /// 可用维度权重占总权重比例
    pub weight_coverage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDimension {
    pub dimension: Dimension,
    pub reason: String,
}

/// 后市预测
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub trend: Classification,
    pub probability: f64,
    pub target_price_low: Option<f64>,
    pub target_price_high: Option<f64>,
    pub time_horizon: String,
    pub risk_level: RiskLevel,
    pub key_factors: Vec<String>,
    pub recommendation: String,
}

/// 基本行情信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicInfo {
    pub name: String,
    pub current_price: Option<f64>,
    pub change_pct: Option<f64>,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub total_market_cap: Option<f64>,
    pub turnover_rate: Option<f64>,
}

/// 一次分析的完整报告，生成后只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeReport {
    pub id: String,
    pub symbol: Symbol,
    pub analysis_time: String,
    pub basic_info: BasicInfo,
    pub dimensions: Vec<DimensionResult>,
    pub outcome: ScoreOutcome,
    pub risk: RiskAssessment,
    pub prediction: Prediction,
    pub narrative: String,
}

impl CompositeReport {
    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionResult> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }
}
