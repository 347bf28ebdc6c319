use crate::models::chip::{
    BehaviorKind, BehaviorStrength, ChipAnalysis, ChipBehavior, ChipStatus, PressureLevel, TrendDirection,
    WindowTrend,
};
use crate::models::market_data::ChipSnapshot;
use crate::models::settings::ChipSettings;

/// 筹码综合分析：多窗口趋势回归 + 行为查表 + 状态评估。序列为空时返回 None
pub fn analyze(series: &[ChipSnapshot], current_price: Option<f64>, settings: &ChipSettings) -> Option<ChipAnalysis> {
    let latest = series.last()?.clone();

    let windows = window_trends(series, settings);
    let concentration_trend = combine(windows.iter().map(|w| w.concentration_trend).collect());
    let winner_trend = combine(windows.iter().map(|w| w.winner_trend).collect());
    let behavior = classify_behavior(concentration_trend, winner_trend);
    let cost_center_trend = cost_center_trend(series);

    let status = chip_status(latest.concentration_90);
    let (pressure_level, mut support_level) = pressure_levels(latest.winner_rate);

    let mut signals = Vec::new();
    match status {
        ChipStatus::HighlyConcentrated => signals.push("筹码高度集中，主力控盘明显".to_string()),
        ChipStatus::Concentrated => signals.push("筹码较为集中".to_string()),
        ChipStatus::Dispersed => signals.push("筹码分散，持仓分歧较大".to_string()),
        ChipStatus::Neutral => {}
    }

    let winner_pct = latest.winner_rate * 100.0;
    match pressure_level {
        PressureLevel::High => signals.push(format!("获利比例极高({:.1}%)，存在较大获利回吐压力", winner_pct)),
        PressureLevel::MediumHigh => signals.push(format!("获利比例较高({:.1}%)，注意获利盘压力", winner_pct)),
        PressureLevel::Low if latest.winner_rate < 0.10 => {
            signals.push(format!("获利比例极低({:.1}%)，多数筹码被套", winner_pct))
        }
        PressureLevel::Low => signals.push(format!("获利比例较低({:.1}%)，套牢盘较多", winner_pct)),
        PressureLevel::Medium => {}
    }

    if let Some(price) = current_price.filter(|p| *p > 0.0) {
        if latest.avg_cost > 0.0 {
            let deviation = (price - latest.avg_cost) / latest.avg_cost;
            if deviation > 0.15 {
                signals.push(format!("当前价格高于平均成本{:.1}%，获利盘较多", deviation * 100.0));
            } else if deviation < -0.15 {
                signals.push(format!("当前价格低于平均成本{:.1}%，套牢盘压力大", deviation.abs() * 100.0));
                support_level = PressureLevel::Low;
            } else {
                signals.push("当前价格接近平均成本，多空博弈区间".to_string());
            }
        }
    }

    match concentration_trend {
        TrendDirection::Rising => signals.push("筹码趋于集中，可能有主力吸筹".to_string()),
        TrendDirection::Falling => signals.push("筹码趋于分散，可能有主力派发".to_string()),
        TrendDirection::Flat => {}
    }
    match cost_center_trend {
        TrendDirection::Rising => signals.push("成本中心上移，市场换手充分".to_string()),
        TrendDirection::Falling => signals.push("成本中心下移，持仓成本降低".to_string()),
        TrendDirection::Flat => {}
    }
    signals.push(behavior.description.clone());

    let trend_desc = match concentration_trend {
        TrendDirection::Rising => "筹码趋于集中",
        TrendDirection::Falling => "筹码趋于分散",
        TrendDirection::Flat => "筹码分布稳定",
    };
    let summary = format!(
        "{}，获利比例{:.1}%，平均成本{:.2}元，{}，{}。",
        status.label(),
        winner_pct,
        latest.avg_cost,
        trend_desc,
        behavior.label
    );

    Some(ChipAnalysis {
        latest,
        windows,
        concentration_trend,
        winner_trend,
        cost_center_trend,
        behavior,
        status,
        pressure_level,
        support_level,
        signals,
        summary,
    })
}

/// 集中度趋势 × 获利比例趋势 → 主力行为。3×3 全覆盖
pub fn classify_behavior(concentration: TrendDirection, profit: TrendDirection) -> ChipBehavior {
    use BehaviorKind::*;
    use BehaviorStrength::*;
    use TrendDirection::{Falling, Flat, Rising};

    let (kind, strength, label, description) = match (concentration, profit) {
        (Rising, Rising) => (Accumulation, Some(Moderate), "拉升吸筹", "筹码集中且获利盘增加，主力边拉边收"),
        (Rising, Flat) => (Accumulation, Some(Moderate), "横盘吸筹", "筹码集中、获利比例平稳，主力横盘收集"),
        (Rising, Falling) => (Accumulation, Some(Strong), "低位吸筹", "筹码集中而获利盘减少，主力逢低吸筹"),
        (Flat, Rising) => (Neutral, Some(Weak), "获利惜售", "筹码结构稳定，获利盘增加但未见兑现"),
        (Flat, Flat) => (Neutral, None, "震荡整理", "筹码与获利比例均无明显变化"),
        (Flat, Falling) => (Neutral, Some(Weak), "套牢观望", "筹码结构稳定，套牢盘增加"),
        (Falling, Rising) => (Distribution, Some(Strong), "高位派发", "筹码分散且获利盘增加，主力借涨出货"),
        (Falling, Flat) => (Distribution, Some(Moderate), "筹码松动", "筹码分散、获利比例平稳，持仓趋于松动"),
        (Falling, Falling) => (Distribution, Some(Weak), "恐慌出逃", "筹码分散且获利盘减少，割肉盘涌出"),
    };

    ChipBehavior {
        kind,
        strength,
        label: label.to_string(),
        description: description.to_string(),
    }
}

/// 各窗口（短/中/长）最近 N 个交易日的回归趋势；点数不足的窗口跳过
pub fn window_trends(series: &[ChipSnapshot], settings: &ChipSettings) -> Vec<WindowTrend> {
    let mut windows = settings.windows.clone();
    windows.sort_unstable();
    windows.dedup();

    windows
        .into_iter()
        .filter_map(|window| {
            let slice = &series[series.len().saturating_sub(window)..];
            if slice.len() < settings.min_window_points.max(2) {
                return None;
            }

            let conc: Vec<f64> = slice.iter().map(|s| s.concentration_90).collect();
            let winner: Vec<f64> = slice.iter().map(|s| s.winner_rate).collect();
            let mean = conc.iter().sum::<f64>() / conc.len() as f64;
            let concentration_slope = if mean > 0.0 { ols_slope(&conc) / mean } else { 0.0 };
            let winner_slope = ols_slope(&winner);

            let thr_c = settings.concentration_slope_threshold;
            let thr_w = settings.winner_slope_threshold;
            // 集中度数值变小 = 成本区间收窄 = 筹码趋于集中
            let concentration_trend = if concentration_slope < -thr_c {
                TrendDirection::Rising
            } else if concentration_slope > thr_c {
                TrendDirection::Falling
            } else {
                TrendDirection::Flat
            };
            let winner_trend = if winner_slope > thr_w {
                TrendDirection::Rising
            } else if winner_slope < -thr_w {
                TrendDirection::Falling
            } else {
                TrendDirection::Flat
            };

            Some(WindowTrend {
                window,
                points: slice.len(),
                concentration_slope,
                winner_slope,
                concentration_trend,
                winner_trend,
            })
        })
        .collect()
}

/// 至少两个窗口一致的方向胜出；否则取最短窗口；无窗口为 Flat
pub fn combine(trends: Vec<TrendDirection>) -> TrendDirection {
    TrendDirection::ALL
        .into_iter()
        .find(|t| trends.iter().filter(|x| *x == t).count() >= 2)
        .or_else(|| trends.first().copied())
        .unwrap_or(TrendDirection::Flat)
}

/// 最小二乘斜率（x 为 0..n）
pub fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n_f;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 { 0.0 } else { num / den }
}

/// 成本中心：最近5日均值对比早期窗口，±2%
fn cost_center_trend(series: &[ChipSnapshot]) -> TrendDirection {
    let n = series.len();
    if n < 5 {
        return TrendDirection::Flat;
    }
    let recent_n = 5;
    let early_start = n.saturating_sub(20);
    let early_end = recent_n.max(n.saturating_sub(10));
    if early_end <= early_start {
        return TrendDirection::Flat;
    }

    let mean = |s: &[ChipSnapshot]| s.iter().map(|c| c.avg_cost).sum::<f64>() / s.len() as f64;
    let recent = mean(&series[n - recent_n..]);
    let early = mean(&series[early_start..early_end]);

    if recent > early * 1.02 {
        TrendDirection::Rising
    } else if recent < early * 0.98 {
        TrendDirection::Falling
    } else {
        TrendDirection::Flat
    }
}

fn chip_status(concentration_90: f64) -> ChipStatus {
    if concentration_90 < 0.10 {
        ChipStatus::HighlyConcentrated
    } else if concentration_90 < 0.20 {
        ChipStatus::Concentrated
    } else if concentration_90 > 0.40 {
        ChipStatus::Dispersed
    } else {
        ChipStatus::Neutral
    }
}

/// (获利盘压力, 支撑强度)
fn pressure_levels(winner_rate: f64) -> (PressureLevel, PressureLevel) {
    if winner_rate > 0.90 {
        (PressureLevel::High, PressureLevel::Medium)
    } else if winner_rate > 0.70 {
        (PressureLevel::MediumHigh, PressureLevel::Medium)
    } else if winner_rate < 0.10 {
        (PressureLevel::Low, PressureLevel::Low)
    } else if winner_rate < 0.30 {
        (PressureLevel::Low, PressureLevel::Medium)
    } else {
        (PressureLevel::Medium, PressureLevel::Medium)
    }
}
