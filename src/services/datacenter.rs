//! 东方财富数据中心（datacenter-web）报表查询与解析。
//!
//! 所有报表走同一个 `/api/data/v1/get` 接口，按 `reportName` 区分；
//! 无数据时接口返回 `result: null`（code 9201），这里统一解析为空列表，
//! 由调用方决定空表是“无数据”还是“区间内无事件”。

use regex::Regex;
use serde_json::Value;

use crate::error::{FetchError, FetchResult};
use crate::models::market_data::{
    BlockTrade, DividendRecord, DragonTigerRecord, FinancialPeriod, InstitutionHolding, InstitutionSeatSummary,
    MarginRecord, NorthboundFlowDay, NorthboundHolding, ResearchVisit, ShareholderPeriod, UnlockEvent,
};

pub const RPT_FINANCIALS: &str = "RPT_LICO_FN_CPD";
pub const RPT_BILLBOARD: &str = "RPT_DAILYBILLBOARD_DETAILSNEW";
pub const RPT_BILLBOARD_ORG: &str = "RPT_ORGANIZATION_TRADE_DETAILS";
pub const RPT_MARGIN: &str = "RPTA_WEB_RZRQ_GGMX";
pub const RPT_NORTH_HOLDING: &str = "RPT_MUTUAL_HOLDSTOCKNORTH_STA";
pub const RPT_NORTH_FLOW: &str = "RPT_MUTUAL_DEAL_HISTORY";
pub const RPT_BLOCK_TRADE: &str = "RPT_DATA_BLOCKTRADE";
pub const RPT_HOLDER_NUM: &str = "RPT_HOLDERNUM_DET";
pub const RPT_ORG_HOLD: &str = "RPT_MAIN_ORGHOLD";
pub const RPT_ORG_SURVEY: &str = "RPT_ORG_SURVEYNEW";
pub const RPT_LIFT: &str = "RPT_LIFT_STAGE";
pub const RPT_BONUS: &str = "RPT_SHAREBONUS_DET";

/// 数据中心报表查询参数
#[derive(Debug, Clone)]
pub struct DatacenterQuery {
    report: &'static str,
    filter: String,
    sort_column: &'static str,
    descending: bool,
    page_size: u32,
}

impl DatacenterQuery {
    pub fn new(report: &'static str, sort_column: &'static str) -> Self {
        Self {
            report,
            filter: String::new(),
            sort_column,
            descending: true,
            page_size: 50,
        }
    }

    /// 追加一个过滤条件，如 `SECURITY_CODE="600519"`
    pub fn filter(mut self, condition: impl AsRef<str>) -> Self {
        self.filter.push('(');
        self.filter.push_str(condition.as_ref());
        self.filter.push(')');
        self
    }

    pub fn code(self, code: &str) -> Self {
        self.filter(format!("SECURITY_CODE=\"{}\"", code))
    }

    /// `column >= 'date'`
    pub fn since(self, column: &str, date: &str) -> Self {
        self.filter(format!("{}>='{}'", column, date))
    }

    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    pub fn report(&self) -> &'static str {
        self.report
    }

    pub fn url(&self, base: &str) -> String {
        let mut url = format!(
            "{}/api/data/v1/get?callback=datatable&reportName={}&columns=ALL&pageNumber=1&pageSize={}&sortColumns={}&sortTypes={}&source=WEB&client=WEB",
            base,
            self.report,
            self.page_size,
            self.sort_column,
            if self.descending { -1 } else { 1 }
        );
        if !self.filter.is_empty() {
            url.push_str("&filter=");
            url.push_str(&urlencoding::encode(&self.filter));
        }
        url
    }
}

/// 取出 `result.data`；无数据返回空列表，其他失败为格式错误
pub fn parse_rows(json: &Value) -> FetchResult<Vec<Value>> {
    match json.get("result") {
        Some(Value::Object(result)) => Ok(result
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default()),
        Some(Value::Null) | None => {
            let code = json.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let success = json.get("success").and_then(|s| s.as_bool()).unwrap_or(false);
            if code == 9201 || success {
                Ok(Vec::new())
            } else {
                let message = json.get("message").and_then(|m| m.as_str()).unwrap_or("未知错误");
                Err(FetchError::Malformed(format!("数据中心返回错误 {}: {}", code, message)))
            }
        }
        Some(other) => Err(FetchError::Malformed(format!("result 字段类型异常: {}", other))),
    }
}

// ============================================================
// 字段读取
// ============================================================

/// 按候选字段名依次取数值，数字或数字字符串均可
fn opt_num(row: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match row.get(*k) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn num(row: &Value, keys: &[&str]) -> f64 {
    opt_num(row, keys).unwrap_or(0.0)
}

fn text(row: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| row.get(*k).and_then(|v| v.as_str()))
        .unwrap_or("")
        .trim()
        .to_string()
}

/// "2024-06-28 00:00:00" -> "2024-06-28"
fn date(row: &Value, keys: &[&str]) -> String {
    let raw = text(row, keys);
    raw.get(..10).map(str::to_string).unwrap_or(raw)
}

// ============================================================
// 各报表解析
// ============================================================

/// 业绩报表（报告期降序）
pub fn parse_financials(rows: &[Value]) -> Vec<FinancialPeriod> {
    rows.iter()
        .map(|r| FinancialPeriod {
            report_date: date(r, &["REPORTDATE", "REPORT_DATE"]),
            eps: num(r, &["BASIC_EPS"]),
            bps: num(r, &["BPS"]),
            revenue: num(r, &["TOTAL_OPERATE_INCOME"]),
            revenue_yoy: num(r, &["YSTZ"]),
            net_profit: num(r, &["PARENT_NETPROFIT"]),
            net_profit_yoy: num(r, &["SJLTZ"]),
            roe: num(r, &["WEIGHTAVG_ROE"]),
            gross_margin: num(r, &["XSMLL"]),
            debt_ratio: opt_num(r, &["ZCFZL", "DEBT_ASSET_RATIO"]),
        })
        .filter(|p| !p.report_date.is_empty())
        .collect()
}

pub fn parse_billboard(rows: &[Value]) -> Vec<DragonTigerRecord> {
    rows.iter()
        .map(|r| {
            let buy_amount = num(r, &["BILLBOARD_BUY_AMT"]);
            let sell_amount = num(r, &["BILLBOARD_SELL_AMT"]);
            DragonTigerRecord {
                date: date(r, &["TRADE_DATE"]),
                reason: text(r, &["EXPLANATION", "EXPLAIN"]),
                close_price: num(r, &["CLOSE_PRICE"]),
                change_pct: num(r, &["CHANGE_RATE"]),
                buy_amount,
                sell_amount,
                net_buy: opt_num(r, &["BILLBOARD_NET_AMT"]).unwrap_or(buy_amount - sell_amount),
            }
        })
        .collect()
}

/// 机构席位买卖汇总，区间内无机构席位时为 None
pub fn summarize_institution_seats(rows: &[Value]) -> Option<InstitutionSeatSummary> {
    if rows.is_empty() {
        return None;
    }
    let mut summary = InstitutionSeatSummary {
        records_count: rows.len(),
        ..Default::default()
    };
    for r in rows {
        let buy = num(r, &["BUY_AMT"]);
        let sell = num(r, &["SELL_AMT"]);
        summary.buy_institution_count += num(r, &["BUY_TIMES"]) as u32;
        summary.sell_institution_count += num(r, &["SELL_TIMES"]) as u32;
        summary.total_buy += buy;
        summary.total_sell += sell;
        summary.net_buy += opt_num(r, &["NET_BUY_AMT"]).unwrap_or(buy - sell);
    }
    Some(summary)
}

/// 融资融券明细，返回日期升序
pub fn parse_margin(rows: &[Value]) -> Vec<MarginRecord> {
    let mut records: Vec<MarginRecord> = rows
        .iter()
        .map(|r| MarginRecord {
            date: date(r, &["DATE", "TRADE_DATE"]),
            margin_balance: num(r, &["RZYE"]),
            margin_buy: num(r, &["RZMRE"]),
            margin_repay: num(r, &["RZCHE"]),
            short_balance: num(r, &["RQYL"]),
            short_sell: num(r, &["RQMCL"]),
        })
        .collect();
    records.sort_by(|a, b| a.date.cmp(&b.date));
    records
}

/// 北向个股持股，返回日期升序
pub fn parse_north_holdings(rows: &[Value]) -> Vec<NorthboundHolding> {
    let mut holdings: Vec<NorthboundHolding> = rows
        .iter()
        .map(|r| NorthboundHolding {
            date: date(r, &["TRADE_DATE", "HOLD_DATE"]),
            hold_shares: num(r, &["HOLD_SHARES"]),
            hold_value: num(r, &["HOLD_MARKET_CAP"]),
            hold_ratio_float: num(r, &["A_SHARES_RATIO", "FREE_SHARES_RATIO"]),
            change_shares: num(r, &["ADD_SHARES_REPAIR", "HOLD_SHARES_CHANGE"]),
        })
        .collect();
    holdings.sort_by(|a, b| a.date.cmp(&b.date));
    holdings
}

/// 北向整体成交净买额（百万元 -> 元），返回日期升序
pub fn parse_north_flow(rows: &[Value]) -> Vec<NorthboundFlowDay> {
    let mut days: Vec<NorthboundFlowDay> = rows
        .iter()
        .filter_map(|r| {
            let net = opt_num(r, &["NET_DEAL_AMT"])?;
            Some(NorthboundFlowDay {
                date: date(r, &["TRADE_DATE"]),
                net_buy: net * 1e6,
            })
        })
        .collect();
    days.sort_by(|a, b| a.date.cmp(&b.date));
    days
}

pub fn parse_block_trades(rows: &[Value]) -> Vec<BlockTrade> {
    rows.iter()
        .map(|r| {
            let trade_price = num(r, &["DEAL_PRICE"]);
            let close_price = num(r, &["CLOSE_PRICE"]);
            let premium_rate = opt_num(r, &["PREMIUM_RATIO"]).unwrap_or_else(|| {
                if close_price > 0.0 { (trade_price - close_price) / close_price * 100.0 } else { 0.0 }
            });
            BlockTrade {
                date: date(r, &["TRADE_DATE"]),
                trade_price,
                close_price,
                premium_rate,
                volume: num(r, &["DEAL_VOLUME"]),
                amount: num(r, &["DEAL_AMT"]),
                buyer: text(r, &["BUYER_NAME"]),
                seller: text(r, &["SELLER_NAME"]),
            }
        })
        .collect()
}

/// 股东户数（统计截止日降序）
pub fn parse_shareholders(rows: &[Value]) -> Vec<ShareholderPeriod> {
    rows.iter()
        .map(|r| {
            let holder_count = num(r, &["HOLDER_NUM"]) as u64;
            let holder_count_prev = num(r, &["PRE_HOLDER_NUM"]) as u64;
            let holder_change_pct = opt_num(r, &["HOLDER_NUM_RATIO"]).unwrap_or_else(|| {
                if holder_count_prev > 0 {
                    (holder_count as f64 - holder_count_prev as f64) / holder_count_prev as f64 * 100.0
                } else {
                    0.0
                }
            });
            ShareholderPeriod {
                date: date(r, &["END_DATE"]),
                holder_count,
                holder_count_prev,
                holder_change_pct,
                avg_hold_shares: num(r, &["AVG_HOLD_NUM"]),
                avg_hold_value: num(r, &["AVG_MARKET_CAP"]),
                price_change_pct: num(r, &["INTERVAL_CHRATE"]),
            }
        })
        .filter(|p| p.holder_count > 0)
        .collect()
}

/// 机构持仓合计：取最新报告期，机构数变化与上一期对比
pub fn parse_org_holding(rows: &[Value]) -> Option<InstitutionHolding> {
    let mut periods: Vec<(String, u32, f64)> = rows
        .iter()
        .map(|r| {
            (
                date(r, &["REPORT_DATE"]),
                num(r, &["HOULD_NUM", "HOLD_NUM", "ORG_NUM"]) as u32,
                num(r, &["FREE_SHARES_RATIO", "HOLD_RATIO"]),
            )
        })
        .filter(|(d, _, _)| !d.is_empty())
        .collect();
    periods.sort_by(|a, b| b.0.cmp(&a.0));
    periods.dedup_by(|a, b| a.0 == b.0);

    let (report_date, count, ratio) = periods.first()?.clone();
    let (institution_change, hold_ratio_change) = match periods.get(1) {
        Some((_, prev_count, prev_ratio)) => (i64::from(count) - i64::from(*prev_count), ratio - prev_ratio),
        None => (0, 0.0),
    };
    Some(InstitutionHolding {
        report_date,
        institution_count: count,
        institution_change,
        hold_ratio: ratio,
        hold_ratio_change,
    })
}

pub fn parse_research_visits(rows: &[Value]) -> Vec<ResearchVisit> {
    rows.iter()
        .map(|r| ResearchVisit {
            date: date(r, &["RECEIVE_START_DATE", "NOTICE_DATE"]),
            org_count: num(r, &["SUM", "RECEIVE_ORG_NUM"]) as u32,
            description: text(r, &["RECEIVE_WAY_EXPLAIN", "RECEIVE_OBJECT"]),
        })
        .collect()
}

/// 限售解禁，FREE_RATIO 为小数，转为百分比
pub fn parse_unlocks(rows: &[Value]) -> Vec<UnlockEvent> {
    let mut events: Vec<UnlockEvent> = rows
        .iter()
        .map(|r| UnlockEvent {
            date: date(r, &["FREE_DATE"]),
            share_type: text(r, &["FREE_SHARES_TYPE"]),
            shares: num(r, &["CURRENT_FREE_SHARES", "ABLE_FREE_SHARES"]),
            market_value: num(r, &["LIFT_MARKET_CAP"]),
            float_ratio: num(r, &["FREE_RATIO"]) * 100.0,
        })
        .filter(|e| !e.date.is_empty())
        .collect();
    events.sort_by(|a, b| a.date.cmp(&b.date));
    events
}

/// 分红送配。缺少派现字段时从方案描述中解析 "10派X元"
pub fn parse_dividends(rows: &[Value]) -> Vec<DividendRecord> {
    let cash_re = Regex::new(r"派([\d.]+)元").ok();
    rows.iter()
        .map(|r| {
            let plan = text(r, &["IMPL_PLAN_PROFILE"]);
            let cash_per_10 = opt_num(r, &["PRETAX_BONUS_RMB"]).unwrap_or_else(|| {
                cash_re
                    .as_ref()
                    .and_then(|re| re.captures(&plan))
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .unwrap_or(0.0)
            });
            DividendRecord {
                report_date: date(r, &["REPORT_DATE"]),
                plan,
                cash_per_10,
                dividend_yield: num(r, &["DIVIDENT_RATIO"]) * 100.0,
                progress: text(r, &["ASSIGN_PROGRESS"]),
                ex_date: date(r, &["EX_DIVIDEND_DATE"]),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_url() {
        let url = DatacenterQuery::new(RPT_MARGIN, "DATE")
            .filter("scode=\"600519\"")
            .page_size(20)
            .url("https://datacenter-web.eastmoney.com");
        assert!(url.starts_with("https://datacenter-web.eastmoney.com/api/data/v1/get?callback=datatable&reportName=RPTA_WEB_RZRQ_GGMX"));
        assert!(url.contains("pageSize=20&sortColumns=DATE&sortTypes=-1"));
        assert!(url.ends_with("&filter=%28scode%3D%22600519%22%29"));
    }

    #[test]
    fn test_parse_rows_empty_and_error() {
        let empty = json!({"result": null, "success": false, "message": "返回数据为空", "code": 9201});
        assert!(parse_rows(&empty).unwrap().is_empty());

        let bad = json!({"result": null, "success": false, "message": "报表不存在", "code": 9501});
        assert!(matches!(parse_rows(&bad), Err(FetchError::Malformed(_))));

        let ok = json!({"result": {"pages": 1, "count": 1, "data": [{"A": 1}]}, "success": true, "code": 0});
        assert_eq!(parse_rows(&ok).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_financials() {
        let rows = vec![json!({
            "SECURITY_CODE": "600519",
            "REPORTDATE": "2024-03-31 00:00:00",
            "BASIC_EPS": 19.16, "BPS": 215.0, "TOTAL_OPERATE_INCOME": 4.64e10,
            "YSTZ": 18.04, "PARENT_NETPROFIT": 2.4e10, "SJLTZ": 15.73,
            "WEIGHTAVG_ROE": 9.0, "XSMLL": 91.9
        })];
        let periods = parse_financials(&rows);
        assert_eq!(periods[0].report_date, "2024-03-31");
        assert_eq!(periods[0].eps, 19.16);
        assert_eq!(periods[0].debt_ratio, None);
    }

    #[test]
    fn test_institution_seats_summary() {
        let rows = vec![
            json!({"TRADE_DATE": "2024-06-03 00:00:00", "BUY_TIMES": 2, "SELL_TIMES": 1, "BUY_AMT": 5e7, "SELL_AMT": 2e7, "NET_BUY_AMT": 3e7}),
            json!({"TRADE_DATE": "2024-06-12 00:00:00", "BUY_TIMES": 0, "SELL_TIMES": 3, "BUY_AMT": 0, "SELL_AMT": 6e7}),
        ];
        let s = summarize_institution_seats(&rows).unwrap();
        assert_eq!(s.records_count, 2);
        assert_eq!(s.buy_institution_count, 2);
        assert_eq!(s.sell_institution_count, 4);
        assert_eq!(s.net_buy, -3e7);
        assert!(summarize_institution_seats(&[]).is_none());
    }

    #[test]
    fn test_margin_sorted_ascending() {
        let rows = vec![
            json!({"DATE": "2024-06-28 00:00:00", "RZYE": 2.0e10}),
            json!({"DATE": "2024-06-27 00:00:00", "RZYE": 1.9e10}),
        ];
        let records = parse_margin(&rows);
        assert_eq!(records[0].date, "2024-06-27");
        assert_eq!(records[1].margin_balance, 2.0e10);
    }

    #[test]
    fn test_org_holding_change() {
        let rows = vec![
            json!({"REPORT_DATE": "2023-12-31 00:00:00", "HOULD_NUM": 1200, "FREE_SHARES_RATIO": 60.5}),
            json!({"REPORT_DATE": "2024-03-31 00:00:00", "HOULD_NUM": "980", "FREE_SHARES_RATIO": 61.0}),
        ];
        let h = parse_org_holding(&rows).unwrap();
        assert_eq!(h.report_date, "2024-03-31");
        assert_eq!(h.institution_count, 980);
        assert_eq!(h.institution_change, -220);
        assert!((h.hold_ratio_change - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dividend_cash_from_plan() {
        let rows = vec![json!({
            "REPORT_DATE": "2023-12-31 00:00:00",
            "IMPL_PLAN_PROFILE": "10派308.76元(含税)",
            "DIVIDENT_RATIO": 0.0205,
            "ASSIGN_PROGRESS": "实施分配",
            "EX_DIVIDEND_DATE": "2024-06-19 00:00:00"
        })];
        let d = parse_dividends(&rows);
        assert_eq!(d[0].cash_per_10, 308.76);
        assert!((d[0].dividend_yield - 2.05).abs() < 1e-9);
        assert!(d[0].is_paid());
    }

    #[test]
    fn test_shareholder_change_fallback() {
        let rows = vec![json!({"END_DATE": "2024-03-31", "HOLDER_NUM": 95000, "PRE_HOLDER_NUM": 100000})];
        let p = parse_shareholders(&rows);
        assert!((p[0].holder_change_pct + 5.0).abs() < 1e-9);
    }
}
