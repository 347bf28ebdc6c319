//! 筹码成本分布（CYQ）计算。
//!
//! 每个交易日按换手率衰减已有筹码，再把当日成交的筹码以三角形密度
//! 摊到 [最低价, 最高价] 上（峰值在当日均价），价格网格为固定档数。

use crate::error::{FetchError, FetchResult};
use crate::models::market_data::ChipSnapshot;
use crate::models::stock::KlineItem;

/// 按日滚动计算筹码分布，返回最近 `keep` 个交易日的快照（日期升序）
///
/// K线需按日期升序且带换手率；全部换手率为 0 时无法计算，返回 `FetchError::Empty`
pub fn compute_series(klines: &[KlineItem], buckets: usize, keep: usize) -> FetchResult<Vec<ChipSnapshot>> {
    let valid: Vec<&KlineItem> = klines
        .iter()
        .filter(|k| k.high > 0.0 && k.low > 0.0 && k.high >= k.low)
        .collect();
    if valid.is_empty() {
        return Err(FetchError::Empty("筹码分布（K线）".to_string()));
    }
    if valid.iter().all(|k| k.turnover_rate <= 0.0) {
        return Err(FetchError::Empty("筹码分布（换手率）".to_string()));
    }

    let buckets = buckets.max(2);
    let min_price = valid.iter().map(|k| k.low).fold(f64::INFINITY, f64::min);
    let max_price = valid.iter().map(|k| k.high).fold(f64::NEG_INFINITY, f64::max);
    let grid = PriceGrid::new(min_price, max_price, buckets);

    let mut chips = vec![0.0_f64; buckets];
    let mut snapshots = Vec::with_capacity(valid.len());

    for k in &valid {
        let rate = (k.turnover_rate / 100.0).clamp(0.0, 1.0);
        if rate > 0.0 {
            let day = grid.triangular(k);
            for (c, d) in chips.iter_mut().zip(day.iter()) {
                *c = *c * (1.0 - rate) + rate * d;
            }
        }
        if let Some(snapshot) = grid.snapshot(&chips, k) {
            snapshots.push(snapshot);
        }
    }

    if snapshots.is_empty() {
        return Err(FetchError::Empty("筹码分布".to_string()));
    }
    let skip = snapshots.len().saturating_sub(keep.max(1));
    Ok(snapshots.split_off(skip))
}

struct PriceGrid {
    min: f64,
    step: f64,
    len: usize,
}

impl PriceGrid {
    fn new(min: f64, max: f64, len: usize) -> Self {
        let step = if max > min { (max - min) / (len - 1) as f64 } else { 0.0 };
        Self { min, step, len }
    }

    fn price(&self, i: usize) -> f64 {
        self.min + self.step * i as f64
    }

    fn index(&self, price: f64) -> usize {
        if self.step == 0.0 {
            return 0;
        }
        let i = ((price - self.min) / self.step).round();
        (i.max(0.0) as usize).min(self.len - 1)
    }

    /// 当日成交筹码的三角形分布，合计为 1
    fn triangular(&self, k: &KlineItem) -> Vec<f64> {
        let mut dist = vec![0.0; self.len];
        let avg = ((k.open + k.close + k.high + k.low) / 4.0).clamp(k.low, k.high);
        let lo = self.index(k.low);
        let hi = self.index(k.high);

        if hi == lo || k.high - k.low < 1e-9 {
            dist[self.index(avg)] = 1.0;
            return dist;
        }

        for (i, slot) in dist.iter_mut().enumerate().take(hi + 1).skip(lo) {
            let p = self.price(i).clamp(k.low, k.high);
            let w = if p <= avg {
                if avg - k.low < 1e-9 { 1.0 } else { (p - k.low) / (avg - k.low) }
            } else if k.high - avg < 1e-9 {
                1.0
            } else {
                (k.high - p) / (k.high - avg)
            };
            *slot = w.max(0.0);
        }

        let total: f64 = dist.iter().sum();
        if total <= 0.0 {
            dist[self.index(avg)] = 1.0;
        } else {
            dist.iter_mut().for_each(|v| *v /= total);
        }
        dist
    }

    fn snapshot(&self, chips: &[f64], k: &KlineItem) -> Option<ChipSnapshot> {
        let total: f64 = chips.iter().sum();
        if total <= 0.0 {
            return None;
        }

        let winner: f64 = chips
            .iter()
            .enumerate()
            .filter(|(i, _)| self.price(*i) <= k.close + 1e-9)
            .map(|(_, c)| c)
            .sum();
        let avg_cost = chips.iter().enumerate().map(|(i, c)| self.price(i) * c).sum::<f64>() / total;

        let cost_at = |q: f64| -> f64 {
            let target = q * total;
            let mut cum = 0.0;
            for (i, c) in chips.iter().enumerate() {
                cum += c;
                if cum >= target - 1e-12 {
                    return self.price(i);
                }
            }
            self.price(self.len - 1)
        };
        let concentration = |low: f64, high: f64| {
            if high + low > 0.0 { (high - low) / (high + low) } else { 0.0 }
        };

        let (cost_90_low, cost_90_high) = (cost_at(0.05), cost_at(0.95));
        let (cost_70_low, cost_70_high) = (cost_at(0.15), cost_at(0.85));

        Some(ChipSnapshot {
            date: k.date.clone(),
            close: k.close,
            winner_rate: (winner / total).clamp(0.0, 1.0),
            avg_cost,
            cost_90_low,
            cost_90_high,
            concentration_90: concentration(cost_90_low, cost_90_high),
            cost_70_low,
            cost_70_high,
            concentration_70: concentration(cost_70_low, cost_70_high),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: usize, low: f64, high: f64, close: f64, turnover: f64) -> KlineItem {
        KlineItem {
            date: format!("2024-03-{:02}", day + 1),
            open: (low + high) / 2.0,
            close,
            high,
            low,
            volume: 1_000.0,
            turnover_rate: turnover,
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_invariants() {
        let klines: Vec<KlineItem> = (0..40)
            .map(|i| {
                let base = 10.0 + (i as f64 * 0.3).sin() * 2.0;
                bar(i, base - 0.3, base + 0.3, base, 3.0)
            })
            .collect();
        let series = compute_series(&klines, 150, 30).unwrap();
        assert_eq!(series.len(), 30);
        assert_eq!(series.last().unwrap().date, klines.last().unwrap().date);

        for s in &series {
            assert!((0.0..=1.0).contains(&s.winner_rate), "获利比例越界: {}", s.winner_rate);
            assert!(s.cost_90_low <= s.cost_70_low, "70%区间应在90%区间内");
            assert!(s.cost_70_low <= s.cost_70_high);
            assert!(s.cost_70_high <= s.cost_90_high);
            assert!(s.concentration_70 <= s.concentration_90 + 1e-12);
            assert!(s.avg_cost >= s.cost_90_low - 0.2 && s.avg_cost <= s.cost_90_high + 0.2);
        }
    }

    #[test]
    fn test_winner_rate_extremes() {
        // 长期在 10 元附近换手，最后一天收在区间最高/最低
        let mut klines: Vec<KlineItem> = (0..20).map(|i| bar(i, 9.5, 10.5, 10.0, 5.0)).collect();
        klines.push(bar(20, 9.0, 12.0, 12.0, 0.1));
        let top = compute_series(&klines, 100, 1).unwrap();
        assert!(top[0].winner_rate > 0.99);

        klines.pop();
        klines.push(bar(20, 9.0, 12.0, 9.0, 0.1));
        let bottom = compute_series(&klines, 100, 1).unwrap();
        assert!(bottom[0].winner_rate < 0.01);
    }

    #[test]
    fn test_tight_trading_concentrates_chips() {
        // 前期宽幅震荡，后期窄幅高换手，集中度应下降（区间收窄）
        let mut klines: Vec<KlineItem> = (0..20).map(|i| bar(i, 8.0, 12.0, 10.0, 5.0)).collect();
        klines.extend((20..40).map(|i| bar(i, 9.9, 10.1, 10.0, 8.0)));
        let series = compute_series(&klines, 150, 40).unwrap();
        let early = series[19].concentration_90;
        let late = series[39].concentration_90;
        assert!(late < early, "窄幅换手后集中度应降低: {} -> {}", early, late);
    }

    #[test]
    fn test_missing_turnover_is_empty() {
        let klines: Vec<KlineItem> = (0..10).map(|i| bar(i, 9.0, 11.0, 10.0, 0.0)).collect();
        assert!(matches!(compute_series(&klines, 150, 10), Err(FetchError::Empty(_))));
        assert!(matches!(compute_series(&[], 150, 10), Err(FetchError::Empty(_))));
    }
}
