use serde_json::Value;

use crate::error::{FetchError, FetchResult};
use crate::models::market_data::IndustryPeer;
use crate::models::stock::QuoteSnapshot;

const ULIST_FIELDS: &str = "f2,f3,f4,f5,f6,f7,f8,f9,f10,f12,f14,f15,f16,f17,f18,f20,f21,f23,f24,f25,f62";

/// 东方财富 ulist.np 实时快照
/// 字段映射：
///   f2=最新价, f3=涨跌幅, f4=涨跌额, f5=成交量(手), f6=成交额,
///   f7=振幅, f8=换手率, f9=市盈率TTM, f10=量比, f12=代码, f14=名称,
///   f15=最高, f16=最低, f17=今开, f18=昨收, f20=总市值, f21=流通市值,
///   f23=市净率, f24=近5日涨幅, f25=近20日涨幅, f62=主力净流入
pub fn ulist_url(base: &str, ut: &str, secid: &str) -> String {
    format!(
        "{}/api/qt/ulist.np/get?fltt=2&invt=2&ut={}&fields={}&secids={}",
        base, ut, ULIST_FIELDS, secid
    )
}

pub fn parse_ulist_snapshot(json: &Value) -> FetchResult<QuoteSnapshot> {
    let item = json
        .get("data")
        .and_then(|d| d.get("diff"))
        .and_then(|d| d.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| FetchError::Empty("实时行情".to_string()))?;

    let code = item.get("f12").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let name = item.get("f14").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let price = get_f64(item, "f2");
    // 停牌或无效数据时最新价为 "-"
    if price <= 0.0 {
        return Err(FetchError::Empty("实时行情".to_string()));
    }

    Ok(QuoteSnapshot {
        code,
        name,
        price,
        change_pct: get_f64(item, "f3"),
        change_amount: get_f64(item, "f4"),
        volume: get_f64(item, "f5"),
        amount: get_f64(item, "f6"),
        amplitude: get_f64(item, "f7"),
        turnover_rate: get_f64(item, "f8"),
        pe_ttm: get_f64(item, "f9"),
        volume_ratio: get_f64(item, "f10"),
        high: get_f64(item, "f15"),
        low: get_f64(item, "f16"),
        open: get_f64(item, "f17"),
        pre_close: get_f64(item, "f18"),
        total_market_cap: get_f64(item, "f20"),
        float_market_cap: get_f64(item, "f21"),
        pb: get_f64(item, "f23"),
        pct_5d: get_f64(item, "f24"),
        pct_20d: get_f64(item, "f25"),
        main_net_inflow: get_f64(item, "f62"),
    })
}

/// 腾讯实时行情（兜底）
/// code: sh600519 / sz000001 / hk00700
pub fn tencent_quote_url(base: &str, code: &str) -> String {
    format!("{}/?_={}&q={}", base, chrono::Utc::now().timestamp(), code)
}

/// 解析腾讯行情响应（已转为 UTF-8），取第一条有效记录
pub fn parse_tencent_quote(text: &str) -> FetchResult<QuoteSnapshot> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .find_map(parse_tencent_line)
        .ok_or_else(|| FetchError::Empty("实时行情".to_string()))
}

fn parse_tencent_line(line: &str) -> Option<QuoteSnapshot> {
    // Format: v_sz002241="51~歌尔股份~002241~22.26~22.27~22.00~...";
    let eq_pos = line.find('=')?;
    let code_raw = line[..eq_pos].trim().strip_prefix("v_")?;
    if !code_raw.starts_with("sh") && !code_raw.starts_with("sz") && !code_raw.starts_with("hk") {
        return None;
    }

    let data_str = line[eq_pos + 1..].trim().trim_end_matches(';').trim_matches('"');
    let parts: Vec<&str> = data_str.split('~').collect();
    if parts.len() < 47 {
        return None;
    }
    let price = parse_float(parts[3]);
    if price <= 0.0 {
        return None;
    }

    // 成交额单位万元，市值单位亿元
    Some(QuoteSnapshot {
        code: parts[2].to_string(),
        name: parts[1].to_string(),
        price,
        pre_close: parse_float(parts[4]),
        open: parse_float(parts[5]),
        volume: parse_float(parts[6]),
        change_amount: parse_float(parts[31]),
        change_pct: parse_float(parts[32]),
        high: parse_float(parts[33]),
        low: parse_float(parts[34]),
        amount: parse_float(parts[37]) * 10_000.0,
        turnover_rate: parse_float(parts[38]),
        pe_ttm: parse_float(parts[39]),
        amplitude: parse_float(parts[43]),
        float_market_cap: parse_float(parts[44]) * 1e8,
        total_market_cap: parse_float(parts[45]) * 1e8,
        pb: parse_float(parts[46]),
        ..Default::default()
    })
}

/// 个股所属行业：f127=行业名称, f198=行业板块代码(BKxxxx)
pub fn stock_profile_url(base: &str, ut: &str, secid: &str) -> String {
    format!(
        "{}/api/qt/stock/get?ut={}&fltt=2&invt=2&secid={}&fields=f57,f58,f127,f198",
        base, ut, secid
    )
}

pub fn parse_industry_board(json: &Value) -> FetchResult<(String, String)> {
    let data = json
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| FetchError::Empty("所属行业".to_string()))?;
    let name = data.get("f127").and_then(|v| v.as_str()).unwrap_or("").trim();
    let board = data.get("f198").and_then(|v| v.as_str()).unwrap_or("").trim();
    if name.is_empty() || name == "-" || !board.starts_with("BK") {
        return Err(FetchError::Empty("所属行业".to_string()));
    }
    Ok((name.to_string(), board.to_string()))
}

/// 行业板块成分股，按总市值降序
pub fn board_members_url(base: &str, ut: &str, board: &str, size: u32) -> String {
    format!(
        "{}/api/qt/clist/get?pn=1&pz={}&po=1&np=1&ut={}&fltt=2&invt=2&fid=f20&fs=b:{}+f:!50&fields=f2,f3,f9,f12,f14,f20,f23",
        base, size, ut, board
    )
}

pub fn parse_board_members(json: &Value) -> Vec<IndustryPeer> {
    let Some(items) = json.get("data").and_then(|d| d.get("diff")).and_then(|d| d.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let code = item.get("f12")?.as_str()?.to_string();
            let price = get_f64(item, "f2");
            if price <= 0.0 {
                return None;
            }
            Some(IndustryPeer {
                code,
                name: item.get("f14").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                price,
                change_pct: get_f64(item, "f3"),
                pe: get_f64(item, "f9"),
                pb: get_f64(item, "f23"),
                total_market_cap: get_f64(item, "f20"),
            })
        })
        .collect()
}

fn parse_float(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

/// 东方财富数值字段可能是数字、数字字符串或 "-"
pub fn get_f64(item: &Value, key: &str) -> f64 {
    item.get(key)
        .and_then(|v| {
            if v.is_f64() {
                v.as_f64()
            } else if v.is_i64() {
                v.as_i64().map(|i| i as f64)
            } else if v.is_u64() {
                v.as_u64().map(|i| i as f64)
            } else if v.is_string() {
                v.as_str().and_then(|s| s.parse::<f64>().ok())
            } else {
                None
            }
        })
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ulist_snapshot() {
        let body = json!({
            "rc": 0,
            "data": {
                "total": 1,
                "diff": [{
                    "f2": 1469.99, "f3": 0.65, "f4": 9.49, "f5": 28000, "f6": 4.1e9,
                    "f7": 1.36, "f8": 0.22, "f9": 21.8, "f10": 0.9, "f12": "600519",
                    "f14": "贵州茅台", "f15": 1475.0, "f16": 1455.1, "f17": 1461.0, "f18": 1460.5,
                    "f20": 1.846e12, "f21": 1.846e12, "f23": 7.9, "f24": -2.1, "f25": -5.3, "f62": "-"
                }]
            }
        });
        let s = parse_ulist_snapshot(&body).unwrap();
        assert_eq!(s.code, "600519");
        assert_eq!(s.name, "贵州茅台");
        assert_eq!(s.pe_ttm, 21.8);
        assert_eq!(s.main_net_inflow, 0.0, "\"-\" 应解析为 0");
    }

    #[test]
    fn test_ulist_suspended_is_empty() {
        let body = json!({"data": {"diff": [{"f2": "-", "f12": "600519", "f14": "贵州茅台"}]}});
        assert!(matches!(parse_ulist_snapshot(&body), Err(FetchError::Empty(_))));
        let body = json!({"data": null});
        assert!(matches!(parse_ulist_snapshot(&body), Err(FetchError::Empty(_))));
    }

    #[test]
    fn test_parse_tencent_quote() {
        let mut fields = vec!["0"; 50];
        fields[0] = "1";
        fields[1] = "平安银行";
        fields[2] = "000001";
        fields[3] = "10.71";
        fields[4] = "10.20";
        fields[5] = "10.20";
        fields[32] = "5.00";
        fields[33] = "10.80";
        fields[34] = "10.10";
        fields[38] = "0.62";
        fields[39] = "4.5";
        fields[45] = "2078.35";
        fields[46] = "0.55";
        let text = format!("v_sz000001=\"{}\";\n", fields.join("~"));

        let s = parse_tencent_quote(&text).unwrap();
        assert_eq!(s.name, "平安银行");
        assert_eq!(s.price, 10.71);
        assert_eq!(s.change_pct, 5.0);
        assert_eq!(s.pe_ttm, 4.5);
        assert!((s.total_market_cap - 2078.35e8).abs() < 1.0);
    }

    #[test]
    fn test_parse_industry_board() {
        let body = json!({"data": {"f57": "600519", "f58": "贵州茅台", "f127": "酿酒行业", "f198": "BK0477"}});
        let (name, board) = parse_industry_board(&body).unwrap();
        assert_eq!(name, "酿酒行业");
        assert_eq!(board, "BK0477");
        assert!(parse_industry_board(&json!({"data": {"f127": "-", "f198": "-"}})).is_err());
    }

    #[test]
    fn test_parse_board_members() {
        let body = json!({"data": {"total": 3, "diff": [
            {"f2": 1469.99, "f3": 0.65, "f9": 21.8, "f12": "600519", "f14": "贵州茅台", "f20": 1.846e12, "f23": 7.9},
            {"f2": "-", "f3": "-", "f9": "-", "f12": "600000", "f14": "停牌股", "f20": "-", "f23": "-"},
            {"f2": 140.5, "f3": -1.2, "f9": 18.3, "f12": "000858", "f14": "五粮液", "f20": 5.45e11, "f23": 4.6}
        ]}});
        let peers = parse_board_members(&body);
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[1].pe, 18.3);
    }

    #[test]
    fn test_tencent_unknown_code() {
        assert!(parse_tencent_quote("v_pv_none_match=\"1\";").is_err());
    }
}
