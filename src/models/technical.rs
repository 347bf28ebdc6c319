use serde::{Deserialize, Serialize};

use super::dimension::Direction;

/// 技术指标序列（与K线逐条对齐，数据不足的位置为 None）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub dates: Vec<String>,
    pub ma5: Vec<Option<f64>>,
    pub ma10: Vec<Option<f64>>,
    pub ma20: Vec<Option<f64>>,
    pub ma60: Vec<Option<f64>>,
    pub ema12: Vec<Option<f64>>,
    pub ema26: Vec<Option<f64>>,
    pub macd_dif: Vec<Option<f64>>,
    pub macd_dea: Vec<Option<f64>>,
    pub macd_hist: Vec<Option<f64>>,
    pub kdj_k: Vec<Option<f64>>,
    pub kdj_d: Vec<Option<f64>>,
    pub kdj_j: Vec<Option<f64>>,
    pub rsi6: Vec<Option<f64>>,
    pub rsi12: Vec<Option<f64>>,
    pub rsi24: Vec<Option<f64>>,
    pub boll_upper: Vec<Option<f64>>,
    pub boll_middle: Vec<Option<f64>>,
    pub boll_lower: Vec<Option<f64>>,
}

/// 最新一根K线上的指标值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestIndicators {
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub macd_dif: Option<f64>,
    pub macd_dea: Option<f64>,
    pub macd_hist: Option<f64>,
    pub kdj_k: Option<f64>,
    pub kdj_d: Option<f64>,
    pub kdj_j: Option<f64>,
    pub rsi6: Option<f64>,
    pub rsi12: Option<f64>,
    pub boll_upper: Option<f64>,
    pub boll_middle: Option<f64>,
    pub boll_lower: Option<f64>,
}

/// 技术信号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSignal {
    pub signal_type: String,
    pub direction: Direction,
    pub description: String,
    pub strength: u8,
    pub date: String,
}

/// 均线排列状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaAlignment {
    #[serde(rename = "bullish")]
    Bullish,
    #[serde(rename = "bearish")]
    Bearish,
    #[serde(rename = "tangled")]
    Tangled,
}

/// 量价关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumePriceRelation {
    #[serde(rename = "volume_up_price_up")]
    VolumeUpPriceUp,
    #[serde(rename = "volume_down_price_up")]
    VolumeDownPriceUp,
    #[serde(rename = "volume_up_price_down")]
    VolumeUpPriceDown,
    #[serde(rename = "volume_down_price_down")]
    VolumeDownPriceDown,
    #[serde(rename = "normal")]
    Normal,
}

/// 价格趋势（收盘价与 MA20/MA60 的相对位置）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTrend {
    Up,
    Down,
    Sideways,
}

impl PriceTrend {
    pub fn label(&self) -> &'static str {
        match self {
            PriceTrend::Up => "上升趋势",
            PriceTrend::Down => "下降趋势",
            PriceTrend::Sideways => "震荡整理",
        }
    }
}

/// 近期信号的综合结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallSignal {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl OverallSignal {
    pub fn label(&self) -> &'static str {
        match self {
            OverallSignal::StrongBuy => "强烈买入",
            OverallSignal::Buy => "买入",
            OverallSignal::Neutral => "中性",
            OverallSignal::Sell => "卖出",
            OverallSignal::StrongSell => "强烈卖出",
        }
    }
}

/// 支撑压力位
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportResistance {
    pub pivot: f64,
    pub resistance1: f64,
    pub resistance2: f64,
    pub support1: f64,
    pub support2: f64,
    pub swing_high: f64,
    pub swing_low: f64,
    /// 当前价下方最近的支撑
    pub nearest_support: Option<f64>,
    /// 当前价上方最近的压力
    pub nearest_resistance: Option<f64>,
}

/// 技术面分析聚合结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub current_price: f64,
    pub trend: PriceTrend,
    pub overall_signal: OverallSignal,
    pub ma_alignment: MaAlignment,
    pub volume_price_relation: VolumePriceRelation,
    pub latest: LatestIndicators,
    pub signals: Vec<TechnicalSignal>,
    pub support_resistance: SupportResistance,
    pub summary: String,
}
