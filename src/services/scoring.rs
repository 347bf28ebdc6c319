use crate::error::ResearchError;
use crate::models::dimension::{DimensionResult, DimensionStatus};
use crate::models::fundamental::FundamentalAnalysis;
use crate::models::report::{
    Classification, Confidence, Prediction, RiskAssessment, RiskLevel, ScoreOutcome, SkippedDimension,
};
use crate::models::settings::{DimensionWeights, ScoringSettings};
use crate::models::technical::{PriceTrend, TechnicalAnalysis};

const KEY_FACTOR_LIMIT: usize = 6;

/// 多维加权评分：base + Σ weight × signal，截断到评分区间
pub struct MultiFactorEngine<'a> {
    weights: &'a DimensionWeights,
    scoring: &'a ScoringSettings,
}

impl<'a> MultiFactorEngine<'a> {
    pub fn new(weights: &'a DimensionWeights, scoring: &'a ScoringSettings) -> Self {
        Self { weights, scoring }
    }

    /// 汇总所有维度。按标准维度顺序求和并保留4位小数，结果与输入顺序无关
    ///
    /// 没有任何权重 > 0 的可用维度时返回 `ResearchError::NoData`
    pub fn score(&self, results: &[DimensionResult]) -> Result<ScoreOutcome, ResearchError> {
        let mut ordered: Vec<&DimensionResult> = results.iter().collect();
        ordered.sort_by_key(|r| r.dimension);

        let mut included = Vec::new();
        let mut skipped = Vec::new();
        let mut total = 0.0;
        let mut available_weight = 0.0;

        // 纳入与贡献都只用引擎配置的权重
        for r in &ordered {
            let weight = self.weights.get(r.dimension);
            match &r.status {
                DimensionStatus::Unavailable { reason } => skipped.push(SkippedDimension {
                    dimension: r.dimension,
                    reason: reason.clone(),
                }),
                DimensionStatus::Available { judgment, .. } if weight > 0.0 => {
                    included.push(r.dimension);
                    available_weight += weight;
                    total += weight * judgment.signal;
                }
                DimensionStatus::Available { .. } => {}
            }
        }

        if included.is_empty() {
            return Err(ResearchError::NoData {
                skipped: skipped.into_iter().map(|s| (s.dimension, s.reason)).collect(),
            });
        }

        let raw = self.scoring.base_score + total;
        let score = round4(raw.clamp(self.scoring.min_score, self.scoring.max_score));
        let classification = self.classify(score);

        // 权重已校验非负
        let configured_weight = self.weights.total();
        let weight_coverage = if configured_weight > 0.0 {
            round4(available_weight / configured_weight)
        } else {
            0.0
        };
        let confidence = if weight_coverage >= 1.0 {
            Confidence::High
        } else if weight_coverage >= 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        log::info!(
            "[scoring] 综合评分 {:.4}（{}），纳入 {} 个维度，跳过 {} 个",
            score,
            classification.label(),
            included.len(),
            skipped.len()
        );

        Ok(ScoreOutcome {
            score,
            classification,
            confidence,
            included,
            skipped,
            weight_coverage,
        })
    }

    /// 严格大于看多阈值为看多，严格小于看空阈值为看空，边界值为中性
    pub fn classify(&self, score: f64) -> Classification {
        if score > self.scoring.bullish_threshold {
            Classification::Bullish
        } else if score < self.scoring.bearish_threshold {
            Classification::Bearish
        } else {
            Classification::Neutral
        }
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// 风险评估：波动（RSI6 超买超卖）、估值（PE）、趋势，两项高为高风险，两项低为低风险
pub fn assess_risk(technical: Option<&TechnicalAnalysis>, fundamental: Option<&FundamentalAnalysis>) -> RiskAssessment {
    let volatility_risk = technical.map(|t| match t.latest.rsi6 {
        Some(rsi) if !(20.0..=80.0).contains(&rsi) => RiskLevel::High,
        _ => RiskLevel::Medium,
    });
    let valuation_risk = fundamental.and_then(|f| f.pe).map(|pe| {
        if pe > 50.0 {
            RiskLevel::High
        } else if pe > 0.0 && pe < 10.0 {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        }
    });
    let trend_risk = technical.map(|t| match t.trend {
        PriceTrend::Down => RiskLevel::High,
        PriceTrend::Up => RiskLevel::Low,
        PriceTrend::Sideways => RiskLevel::Medium,
    });

    let levels = [volatility_risk, valuation_risk, trend_risk].map(|l| l.unwrap_or(RiskLevel::Medium));
    let highs = levels.iter().filter(|l| **l == RiskLevel::High).count();
    let lows = levels.iter().filter(|l| **l == RiskLevel::Low).count();
    let overall_risk = if highs >= 2 {
        RiskLevel::High
    } else if lows >= 2 {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    };

    RiskAssessment {
        volatility_risk,
        valuation_risk,
        trend_risk,
        overall_risk,
    }
}

/// 后市预测：目标价区间 + 操作建议 + 关键因子
pub fn predict(outcome: &ScoreOutcome, risk: &RiskAssessment, price: Option<f64>, results: &[DimensionResult]) -> Prediction {
    let (low_mult, high_mult) = match outcome.classification {
        Classification::Bullish => (1.05, 1.15),
        Classification::Bearish => (0.85, 0.98),
        Classification::Neutral => (0.95, 1.08),
    };
    let price = price.filter(|p| *p > 0.0);
    let round2 = |v: f64| (v * 100.0).round() / 100.0;

    Prediction {
        trend: outcome.classification,
        probability: outcome.score,
        target_price_low: price.map(|p| round2(p * low_mult)),
        target_price_high: price.map(|p| round2(p * high_mult)),
        time_horizon: "短期(1-2周)".to_string(),
        risk_level: risk.overall_risk,
        key_factors: key_factors(results, outcome),
        recommendation: recommendation(outcome.classification, outcome.score, risk.overall_risk).to_string(),
    }
}

/// 贡献绝对值最大的几个因子
fn key_factors(results: &[DimensionResult], outcome: &ScoreOutcome) -> Vec<String> {
    let mut weighted: Vec<(f64, String)> = results
        .iter()
        .filter(|r| outcome.included.contains(&r.dimension))
        .filter_map(|r| r.judgment().map(|j| (r, j)))
        .flat_map(|(r, j)| {
            j.factors
                .iter()
                .filter(|f| f.score != 0.0)
                .map(move |f| ((r.weight * f.score).abs(), format!("{}: {}", r.dimension.label(), f.description)))
        })
        .collect();
    weighted.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let factors: Vec<String> = weighted.into_iter().take(KEY_FACTOR_LIMIT).map(|(_, d)| d).collect();
    if factors.is_empty() {
        vec!["综合分析".to_string()]
    } else {
        factors
    }
}

/// 看多按上涨概率、看空按下跌概率给建议
fn recommendation(classification: Classification, score: f64, risk: RiskLevel) -> &'static str {
    match classification {
        Classification::Bullish => {
            if score > 0.7 {
                if risk == RiskLevel::High { "建议谨慎买入，注意风险控制" } else { "建议买入" }
            } else {
                "建议关注，等待更好的入场时机"
            }
        }
        Classification::Bearish => {
            if 1.0 - score > 0.7 { "建议卖出或观望" } else { "建议减仓或观望" }
        }
        Classification::Neutral => "建议观望，等待趋势明朗",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dimension::{Dimension, Factor, Judgment};
    use crate::models::market_data::FundFlowDay;
    use crate::models::technical::{
        LatestIndicators, MaAlignment, OverallSignal, SupportResistance, VolumePriceRelation,
    };
    use crate::services::judgments;

    fn available(d: Dimension, weight: f64, signal: f64) -> DimensionResult {
        let j = Judgment::from_factors(vec![Factor::new("因子", signal)], "");
        DimensionResult::available(d, weight, serde_json::Value::Null, j)
    }

    fn weights_of(pairs: &[(Dimension, f64)]) -> DimensionWeights {
        let mut w = DimensionWeights::zero();
        for (d, v) in pairs {
            match d {
                Dimension::Technical => w.technical = *v,
                Dimension::Fundamental => w.fundamental = *v,
                Dimension::FundFlow => w.fund_flow = *v,
                Dimension::Chip => w.chip = *v,
                Dimension::Margin => w.margin = *v,
                _ => unreachable!(),
            }
        }
        w
    }

    #[test]
    fn test_worked_example_boundary_is_neutral() {
        // technical 0.20 看多，fundamental 缺失，fund flow 0.10 看空
        let w = weights_of(&[(Dimension::Technical, 0.20), (Dimension::Fundamental, 0.30), (Dimension::FundFlow, 0.10)]);
        let s = ScoringSettings::default();
        let engine = MultiFactorEngine::new(&w, &s);
        let results = vec![
            available(Dimension::Technical, 0.20, 1.0),
            DimensionResult::unavailable(Dimension::Fundamental, 0.30, "网络错误"),
            available(Dimension::FundFlow, 0.10, -1.0),
        ];
        let out = engine.score(&results).unwrap();
        assert_eq!(out.score, 0.6);
        assert_eq!(out.classification, Classification::Neutral, "0.6 恰好在边界，应为中性");
        assert_eq!(out.included, vec![Dimension::Technical, Dimension::FundFlow]);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.confidence, Confidence::Medium);
    }

    #[test]
    fn test_thresholds_exact() {
        let w = DimensionWeights::default();
        let s = ScoringSettings::default();
        let engine = MultiFactorEngine::new(&w, &s);
        assert_eq!(engine.classify(0.6), Classification::Neutral);
        assert_eq!(engine.classify(0.4), Classification::Neutral);
        assert_eq!(engine.classify(0.6001), Classification::Bullish);
        assert_eq!(engine.classify(0.3999), Classification::Bearish);
    }

    #[test]
    fn test_lower_boundary_from_sum() {
        // 0.5 - 0.2 + 0.1 恰好为 0.4
        let w = weights_of(&[(Dimension::Technical, 0.2), (Dimension::FundFlow, 0.1)]);
        let s = ScoringSettings::default();
        let out = MultiFactorEngine::new(&w, &s)
            .score(&[available(Dimension::Technical, 0.2, -1.0), available(Dimension::FundFlow, 0.1, 1.0)])
            .unwrap();
        assert_eq!(out.score, 0.4);
        assert_eq!(out.classification, Classification::Neutral);
    }

    #[test]
    fn test_order_independence() {
        let w = DimensionWeights::default();
        let s = ScoringSettings::default();
        let engine = MultiFactorEngine::new(&w, &s);
        let results = vec![
            available(Dimension::Technical, 0.35, 0.6),
            available(Dimension::Fundamental, 0.30, -1.0 / 3.0),
            available(Dimension::Chip, 0.20, 0.4),
            available(Dimension::Margin, 0.05, 1.0),
            DimensionResult::unavailable(Dimension::Northbound, 0.05, "港股不支持"),
        ];
        let forward = engine.score(&results).unwrap();
        let mut reversed = results.clone();
        reversed.reverse();
        let backward = engine.score(&reversed).unwrap();
        assert_eq!(forward.score, backward.score);
        assert_eq!(forward.included, backward.included);
    }

    #[test]
    fn test_one_missing_dimension_drops_its_contribution() {
        let w = weights_of(&[(Dimension::Technical, 0.35), (Dimension::Chip, 0.20), (Dimension::Margin, 0.05)]);
        let s = ScoringSettings::default();
        let engine = MultiFactorEngine::new(&w, &s);

        let full = engine
            .score(&[
                available(Dimension::Technical, 0.35, 0.6),
                available(Dimension::Chip, 0.20, -0.5),
                available(Dimension::Margin, 0.05, 1.0),
            ])
            .unwrap();
        let missing = engine
            .score(&[
                available(Dimension::Technical, 0.35, 0.6),
                DimensionResult::unavailable(Dimension::Chip, 0.20, "超时"),
                available(Dimension::Margin, 0.05, 1.0),
            ])
            .unwrap();
        // 缺失维度的贡献为 0.20 × -0.5 = -0.1
        assert!((missing.score - (full.score + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_all_missing_is_no_data() {
        let w = DimensionWeights::default();
        let s = ScoringSettings::default();
        let results: Vec<DimensionResult> = Dimension::ALL
            .iter()
            .map(|d| DimensionResult::unavailable(*d, w.get(*d), "网络错误"))
            .collect();
        match MultiFactorEngine::new(&w, &s).score(&results) {
            Err(ResearchError::NoData { skipped }) => assert_eq!(skipped.len(), 14),
            other => panic!("应返回 NoData，实际 {:?}", other),
        }
    }

    #[test]
    fn test_zero_weight_dimension_not_counted() {
        let w = weights_of(&[(Dimension::Technical, 0.35)]);
        let s = ScoringSettings::default();
        let engine = MultiFactorEngine::new(&w, &s);
        // 只有权重为 0 的维度可用，视为无数据
        let err = engine.score(&[available(Dimension::Chip, 0.0, 1.0)]);
        assert!(matches!(err, Err(ResearchError::NoData { .. })));
    }

    #[test]
    fn test_score_clamped_to_range() {
        let mut w = DimensionWeights::zero();
        w.technical = 2.0;
        let s = ScoringSettings::default();
        let out = MultiFactorEngine::new(&w, &s)
            .score(&[available(Dimension::Technical, 2.0, 1.0)])
            .unwrap();
        assert_eq!(out.score, 1.0);
        assert_eq!(out.confidence, Confidence::High);
    }

    #[test]
    fn test_prediction_bands() {
        let outcome = ScoreOutcome {
            score: 0.75,
            classification: Classification::Bullish,
            confidence: Confidence::High,
            included: vec![Dimension::Technical],
            skipped: vec![],
            weight_coverage: 1.0,
        };
        let risk = assess_risk(None, None);
        assert_eq!(risk.overall_risk, RiskLevel::Medium);
        let results = vec![available(Dimension::Technical, 0.35, 0.6)];
        let p = predict(&outcome, &risk, Some(100.0), &results);
        assert_eq!(p.target_price_low, Some(105.0));
        assert_eq!(p.target_price_high, Some(115.0));
        assert_eq!(p.recommendation, "建议买入");
        assert_eq!(p.key_factors, vec!["技术面: 因子".to_string()]);

        let p = predict(&outcome, &risk, None, &results);
        assert_eq!(p.target_price_low, None);
    }

    #[test]
    fn test_uptrend_with_outflow_stays_neutral() {
        // 趋势向上 +0.20，主力净流出 -0.10：0.5 + 0.20 - 0.10 = 0.60，不超过看多阈值
        let ta = TechnicalAnalysis {
            current_price: 10.0,
            trend: PriceTrend::Up,
            overall_signal: OverallSignal::Neutral,
            ma_alignment: MaAlignment::Tangled,
            volume_price_relation: VolumePriceRelation::Normal,
            latest: LatestIndicators::default(),
            signals: vec![],
            support_resistance: SupportResistance::default(),
            summary: String::new(),
        };
        let outflow = vec![FundFlowDay { main_net: -1e7, ..Default::default() }];

        let w = DimensionWeights::default();
        let s = ScoringSettings::default();
        let results = vec![
            DimensionResult::available(Dimension::Technical, w.technical, serde_json::Value::Null, judgments::judge_technical(&ta)),
            DimensionResult::available(Dimension::FundFlow, w.fund_flow, serde_json::Value::Null, judgments::judge_fund_flow(&outflow)),
        ];
        let out = MultiFactorEngine::new(&w, &s).score(&results).unwrap();
        assert_eq!(out.score, 0.6);
        assert_eq!(out.classification, Classification::Neutral);
    }

    #[test]
    fn test_engine_weight_overrides_result_weight() {
        let w = weights_of(&[(Dimension::Technical, 0.1)]);
        let s = ScoringSettings::default();
        let engine = MultiFactorEngine::new(&w, &s);

        // 结果里携带的权重与引擎配置不一致时，以引擎为准
        let out = engine.score(&[available(Dimension::Technical, 0.9, 1.0)]).unwrap();
        assert_eq!(out.score, 0.6);
        assert_eq!(out.included, vec![Dimension::Technical]);

        let err = engine.score(&[available(Dimension::Chip, 0.9, 1.0)]);
        assert!(matches!(err, Err(ResearchError::NoData { .. })), "引擎权重为 0 的维度不纳入");
    }
}
