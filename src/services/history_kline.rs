use serde_json::Value;

use crate::error::{FetchError, FetchResult};
use crate::models::market_data::FundFlowDay;
use crate::models::stock::KlineItem;

/// 东方财富前复权日K（push2his），带成交额/换手率
/// fields2: f51=日期 f52=开 f53=收 f54=高 f55=低 f56=成交量 f57=成交额 f58=振幅 f59=涨跌幅 f60=涨跌额 f61=换手率
pub fn eastmoney_kline_url(base: &str, ut: &str, secid: &str, limit: u32) -> String {
    format!(
        "{}/api/qt/stock/kline/get?secid={}&ut={}&fields1=f1,f2,f3,f4,f5,f6&fields2=f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61&klt=101&fqt=1&end=20500101&lmt={}",
        base, secid, ut, limit
    )
}

pub fn parse_eastmoney_klines(json: &Value) -> FetchResult<Vec<KlineItem>> {
    let lines = json
        .get("data")
        .and_then(|d| d.get("klines"))
        .and_then(|k| k.as_array())
        .ok_or_else(|| FetchError::Empty("日K".to_string()))?;

    let items: Vec<KlineItem> = lines
        .iter()
        .filter_map(|l| l.as_str())
        .filter_map(parse_eastmoney_line)
        .collect();
    if items.is_empty() {
        return Err(FetchError::Empty("日K".to_string()));
    }
    Ok(items)
}

fn parse_eastmoney_line(line: &str) -> Option<KlineItem> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 11 {
        return None;
    }
    Some(KlineItem {
        date: parts[0].to_string(),
        open: parse_float(parts[1]),
        close: parse_float(parts[2]),
        high: parse_float(parts[3]),
        low: parse_float(parts[4]),
        volume: parse_float(parts[5]),
        amount: parse_float(parts[6]),
        change_pct: parse_float(parts[8]),
        turnover_rate: parse_float(parts[10]),
    })
}

/// 腾讯前复权K线（兜底，无换手率）
/// code: sh600519 / sz000001 / hk00700
pub fn tencent_kline_url(base: &str, code: &str, limit: u32) -> String {
    format!("{}/appstock/app/fqkline/get?param={},day,,,{},qfq", base, code, limit)
}

pub fn parse_tencent_klines(json: &Value, code: &str) -> FetchResult<Vec<KlineItem>> {
    let data = json
        .get("data")
        .and_then(|d| d.get(code.to_lowercase()))
        .ok_or_else(|| FetchError::Malformed(format!("腾讯K线数据中未找到 {} 的数据", code)))?;

    // 前复权数据在 qfqday 字段，部分品种只有 day
    let klines = data
        .get("qfqday")
        .or_else(|| data.get("day"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| FetchError::Empty("日K".to_string()))?;

    let mut items = Vec::with_capacity(klines.len());
    for kline in klines {
        if let Some(arr) = kline.as_array() {
            if arr.len() >= 6 {
                items.push(KlineItem {
                    date: arr[0].as_str().unwrap_or("").to_string(),
                    open: parse_kline_f64(&arr[1]),
                    close: parse_kline_f64(&arr[2]),
                    high: parse_kline_f64(&arr[3]),
                    low: parse_kline_f64(&arr[4]),
                    volume: parse_kline_f64(&arr[5]),
                    ..Default::default()
                });
            }
        }
    }
    if items.is_empty() {
        return Err(FetchError::Empty("日K".to_string()));
    }

    // 计算涨跌幅
    for i in 1..items.len() {
        let prev_close = items[i - 1].close;
        if prev_close > 0.0 {
            items[i].change_pct = (items[i].close - prev_close) / prev_close * 100.0;
        }
    }

    Ok(items)
}

/// 个股日资金流向（push2his）
/// fields2: f51=日期 f52=主力净流入 f53=小单 f54=中单 f55=大单 f56=超大单
pub fn fund_flow_url(base: &str, ut: &str, secid: &str, limit: u32) -> String {
    format!(
        "{}/api/qt/stock/fflow/daykline/get?lmt={}&klt=101&secid={}&ut={}&fields1=f1,f2,f3,f7&fields2=f51,f52,f53,f54,f55,f56",
        base, limit, secid, ut
    )
}

pub fn parse_fund_flow(json: &Value) -> FetchResult<Vec<FundFlowDay>> {
    let lines = json
        .get("data")
        .and_then(|d| d.get("klines"))
        .and_then(|k| k.as_array())
        .ok_or_else(|| FetchError::Empty("资金流向".to_string()))?;

    let days: Vec<FundFlowDay> = lines
        .iter()
        .filter_map(|l| l.as_str())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 6 {
                return None;
            }
            Some(FundFlowDay {
                date: parts[0].to_string(),
                main_net: parse_float(parts[1]),
                small_net: parse_float(parts[2]),
                medium_net: parse_float(parts[3]),
                large_net: parse_float(parts[4]),
                super_large_net: parse_float(parts[5]),
            })
        })
        .collect();
    if days.is_empty() {
        return Err(FetchError::Empty("资金流向".to_string()));
    }
    Ok(days)
}

fn parse_float(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

fn parse_kline_f64(val: &Value) -> f64 {
    match val {
        Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}
