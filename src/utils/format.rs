/// 金额格式化：亿 / 万 / 元
pub fn format_amount(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e8 {
        format!("{:.2}亿", v / 1e8)
    } else if abs >= 1e4 {
        format!("{:.0}万", v / 1e4)
    } else {
        format!("{:.0}", v)
    }
}

/// 带符号金额，净流入/净买入展示用
pub fn format_signed_amount(v: f64) -> String {
    if v > 0.0 {
        format!("+{}", format_amount(v))
    } else {
        format_amount(v)
    }
}

pub fn format_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{:.*}", precision, x),
        _ => "-".to_string(),
    }
}
