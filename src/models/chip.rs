use serde::{Deserialize, Serialize};

use super::market_data::ChipSnapshot;

/// 单项指标在窗口内的变化方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Flat,
    Falling,
}

impl TrendDirection {
    pub const ALL: [TrendDirection; 3] = [TrendDirection::Rising, TrendDirection::Flat, TrendDirection::Falling];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Accumulation,
    Distribution,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorStrength {
    Strong,
    Moderate,
    Weak,
}

impl BehaviorStrength {
    pub fn label(&self) -> &'static str {
        match self {
            BehaviorStrength::Strong => "强",
            BehaviorStrength::Moderate => "中",
            BehaviorStrength::Weak => "弱",
        }
    }
}

/// 主力行为判断（集中度趋势 × 获利比例趋势查表所得）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipBehavior {
    pub kind: BehaviorKind,
    pub strength: Option<BehaviorStrength>,
    pub label: String,
    pub description: String,
}

/// 单个窗口的趋势回归结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowTrend {
    pub window: usize,
    pub points: usize,
    /// 90集中度斜率 / 窗口均值（每日）
    pub concentration_slope: f64,
    /// 获利比例斜率（每日）
    pub winner_slope: f64,
    pub concentration_trend: TrendDirection,
    pub winner_trend: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipStatus {
    HighlyConcentrated,
    Concentrated,
    Neutral,
    Dispersed,
}

impl ChipStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ChipStatus::HighlyConcentrated => "筹码高度集中",
            ChipStatus::Concentrated => "筹码较集中",
            ChipStatus::Neutral => "筹码分布适中",
            ChipStatus::Dispersed => "筹码分散",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    Low,
    Medium,
    MediumHigh,
    High,
}

/// 筹码综合分析
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChipAnalysis {
    pub latest: ChipSnapshot,
    pub windows: Vec<WindowTrend>,
    pub concentration_trend: TrendDirection,
    pub winner_trend: TrendDirection,
    pub cost_center_trend: TrendDirection,
    pub behavior: ChipBehavior,
    pub status: ChipStatus,
    pub pressure_level: PressureLevel,
    pub support_level: PressureLevel,
    pub signals: Vec<String>,
    pub summary: String,
}
