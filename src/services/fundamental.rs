use crate::models::fundamental::{FundamentalAnalysis, GrowthLevel, ProfitabilityLevel, ValuationLevel};
use crate::models::market_data::FinancialPeriod;
use crate::models::stock::QuoteSnapshot;

/// 由财报与行情计算基本面比率。`periods` 按报告期倒序（最新在前），为空时返回 None
pub fn analyze(periods: &[FinancialPeriod], snapshot: Option<&QuoteSnapshot>, price: Option<f64>) -> Option<FundamentalAnalysis> {
    let latest = periods.first()?;
    let price = price.filter(|p| *p > 0.0);

    let eps_ttm = eps_ttm(periods);
    let bps = Some(latest.bps).filter(|v| *v != 0.0);

    // 行情接口给的动态市盈率优先，其次用 TTM 每股收益推算
    let pe = snapshot
        .map(|s| s.pe_ttm)
        .filter(|v| *v != 0.0)
        .or_else(|| match (price, eps_ttm) {
            (Some(p), Some(e)) if e != 0.0 => Some(p / e),
            _ => None,
        });
    let pb = snapshot
        .map(|s| s.pb)
        .filter(|v| *v > 0.0)
        .or_else(|| match (price, bps) {
            (Some(p), Some(b)) if b > 0.0 => Some(p / b),
            _ => None,
        });

    let months = report_months(&latest.report_date).unwrap_or(12);
    let roe = Some(latest.roe).filter(|v| *v != 0.0).map(|r| r * 12.0 / months as f64);
    let gross_margin = Some(latest.gross_margin).filter(|v| *v != 0.0);
    let net_margin = (latest.revenue > 0.0).then(|| latest.net_profit / latest.revenue * 100.0);
    let revenue_growth = Some(latest.revenue_yoy);
    let profit_growth = Some(latest.net_profit_yoy);

    Some(FundamentalAnalysis {
        report_date: latest.report_date.clone(),
        eps_ttm,
        bps,
        pe,
        pb,
        roe,
        gross_margin,
        net_margin,
        revenue_growth,
        profit_growth,
        debt_ratio: latest.debt_ratio,
        valuation: valuation_level(pe, pb),
        profitability: profitability_level(roe),
        growth: growth_level(revenue_growth, profit_growth),
    })
}

/// 0 < PE < 15 且 PB < 2 为低估；PE > 50、PB > 8 或亏损为高估
pub fn valuation_level(pe: Option<f64>, pb: Option<f64>) -> ValuationLevel {
    if let Some(pe) = pe {
        if pe <= 0.0 || pe > 50.0 {
            return ValuationLevel::Overvalued;
        }
    }
    if pb.is_some_and(|pb| pb > 8.0) {
        return ValuationLevel::Overvalued;
    }
    match (pe, pb) {
        (Some(pe), Some(pb)) if pe < 15.0 && pb < 2.0 => ValuationLevel::Undervalued,
        _ => ValuationLevel::Fair,
    }
}

pub fn profitability_level(roe: Option<f64>) -> ProfitabilityLevel {
    match roe {
        Some(r) if r >= 15.0 => ProfitabilityLevel::Strong,
        Some(r) if r >= 8.0 => ProfitabilityLevel::Moderate,
        _ => ProfitabilityLevel::Weak,
    }
}

pub fn growth_level(revenue_growth: Option<f64>, profit_growth: Option<f64>) -> GrowthLevel {
    let rev = revenue_growth.unwrap_or(0.0);
    let profit = profit_growth.unwrap_or(0.0);
    if rev >= 20.0 && profit >= 20.0 {
        GrowthLevel::High
    } else if rev >= 5.0 || profit >= 5.0 {
        GrowthLevel::Moderate
    } else {
        GrowthLevel::Low
    }
}

/// 报告期覆盖的月数："2024-09-30" -> 9
fn report_months(report_date: &str) -> Option<u32> {
    let month: u32 = report_date.get(5..7)?.parse().ok()?;
    (1..=12).contains(&month).then_some(month)
}

/// 滚动每股收益：最新累计 + 上年年报 - 上年同期；缺少对比期时按月份年化
fn eps_ttm(periods: &[FinancialPeriod]) -> Option<f64> {
    let latest = periods.first()?;
    let months = report_months(&latest.report_date)?;
    if months == 12 {
        return Some(latest.eps);
    }

    let year: i32 = latest.report_date.get(0..4)?.parse().ok()?;
    let suffix = latest.report_date.get(4..)?;
    let prev_annual = format!("{}-12-31", year - 1);
    let prev_same = format!("{}{}", year - 1, suffix);

    let find = |date: &str| periods.iter().find(|p| p.report_date.starts_with(date)).map(|p| p.eps);
    match (find(&prev_annual), find(&prev_same)) {
        (Some(annual), Some(same)) => Some(latest.eps + annual - same),
        _ => Some(latest.eps * 12.0 / months as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(date: &str, eps: f64) -> FinancialPeriod {
        FinancialPeriod {
            report_date: date.to_string(),
            eps,
            bps: 10.0,
            revenue: 1_000.0,
            revenue_yoy: 25.0,
            net_profit: 200.0,
            net_profit_yoy: 22.0,
            roe: 15.0,
            gross_margin: 60.0,
            debt_ratio: None,
        }
    }

    #[test]
    fn test_eps_ttm_rolls_forward() {
        let periods = vec![
            period("2024-09-30", 3.0),
            period("2024-06-30", 2.0),
            period("2023-12-31", 4.0),
            period("2023-09-30", 2.6),
        ];
        let ttm = eps_ttm(&periods).unwrap();
        assert!((ttm - 4.4).abs() < 1e-9, "3.0 + 4.0 - 2.6 = 4.4，实际 {}", ttm);
    }

    #[test]
    fn test_eps_ttm_annualizes_without_history() {
        let periods = vec![period("2024-06-30", 2.0)];
        assert_eq!(eps_ttm(&periods), Some(4.0));
    }

    #[test]
    fn test_valuation_levels() {
        assert_eq!(valuation_level(Some(12.0), Some(1.5)), ValuationLevel::Undervalued);
        assert_eq!(valuation_level(Some(12.0), Some(3.0)), ValuationLevel::Fair);
        assert_eq!(valuation_level(Some(60.0), Some(1.0)), ValuationLevel::Overvalued);
        assert_eq!(valuation_level(Some(-8.0), Some(1.0)), ValuationLevel::Overvalued);
        assert_eq!(valuation_level(Some(20.0), Some(9.0)), ValuationLevel::Overvalued);
        assert_eq!(valuation_level(None, None), ValuationLevel::Fair);
    }

    #[test]
    fn test_growth_and_profitability_levels() {
        assert_eq!(growth_level(Some(25.0), Some(20.0)), GrowthLevel::High);
        assert_eq!(growth_level(Some(25.0), Some(3.0)), GrowthLevel::Moderate);
        assert_eq!(growth_level(Some(1.0), Some(-10.0)), GrowthLevel::Low);
        assert_eq!(profitability_level(Some(15.0)), ProfitabilityLevel::Strong);
        assert_eq!(profitability_level(Some(8.0)), ProfitabilityLevel::Moderate);
        assert_eq!(profitability_level(None), ProfitabilityLevel::Weak);
    }

    #[test]
    fn test_analyze_uses_price_when_snapshot_missing() {
        let periods = vec![period("2023-12-31", 2.0)];
        let fa = analyze(&periods, None, Some(20.0)).unwrap();
        assert_eq!(fa.pe, Some(10.0));
        assert_eq!(fa.pb, Some(2.0));
        assert_eq!(fa.net_margin, Some(20.0));
        assert_eq!(fa.valuation, ValuationLevel::Fair);
        assert_eq!(fa.profitability, ProfitabilityLevel::Strong);
        assert_eq!(fa.growth, GrowthLevel::High);
        assert!(analyze(&[], None, Some(20.0)).is_none());
    }
}
