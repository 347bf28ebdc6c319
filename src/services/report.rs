use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ResearchError;
use crate::models::dimension::DimensionResult;
use crate::models::report::{CompositeReport, RiskLevel};
use crate::utils::format::{format_amount, format_opt};

/// 生成文字版报告：基本信息、综合评分、分维度、风险、预测，最后列出纳入/跳过的维度
pub fn render_narrative(report: &CompositeReport) -> String {
    let mut lines = Vec::new();
    let info = &report.basic_info;
    let outcome = &report.outcome;
    let title = if info.name.is_empty() {
        report.symbol.prefixed()
    } else {
        format!("{}({})", info.name, report.symbol.prefixed())
    };

    lines.push(format!("==================== {} 综合研究报告 ====================", title));
    lines.push(format!("分析时间: {}    报告编号: {}", report.analysis_time, report.id));
    lines.push(String::new());

    lines.push("【基本信息】".to_string());
    lines.push(format!(
        "当前价: {}  涨跌幅: {}%  市盈率: {}  市净率: {}  总市值: {}  换手率: {}%",
        format_opt(info.current_price, 2),
        format_opt(info.change_pct, 2),
        format_opt(info.pe_ttm, 2),
        format_opt(info.pb, 2),
        info.total_market_cap.map(format_amount).unwrap_or_else(|| "-".to_string()),
        format_opt(info.turnover_rate, 2),
    ));
    lines.push(String::new());

    lines.push("【综合评分】".to_string());
    lines.push(format!(
        "评分 {:.4}（{}），置信度 {}，可用权重占比 {:.0}%",
        outcome.score,
        outcome.classification.label(),
        outcome.confidence.label(),
        outcome.weight_coverage * 100.0
    ));
    lines.push(String::new());

    lines.push("【分维度分析】".to_string());
    for (i, d) in report.dimensions.iter().enumerate() {
        lines.extend(dimension_lines(i + 1, d));
    }
    lines.push(String::new());

    let risk = &report.risk;
    let level = |l: Option<RiskLevel>| l.map(|l| l.label()).unwrap_or("-");
    lines.push("【风险评估】".to_string());
    lines.push(format!(
        "波动风险: {}  估值风险: {}  趋势风险: {}  综合风险: {}",
        level(risk.volatility_risk),
        level(risk.valuation_risk),
        level(risk.trend_risk),
        risk.overall_risk.label()
    ));
    lines.push(String::new());

    let p = &report.prediction;
    lines.push("【后市预测】".to_string());
    let target = match (p.target_price_low, p.target_price_high) {
        (Some(low), Some(high)) => format!("{:.2} ~ {:.2}", low, high),
        _ => "-".to_string(),
    };
    lines.push(format!(
        "趋势: {}  上涨概率: {:.0}%  目标价: {}  周期: {}",
        p.trend.trend_label(),
        p.probability * 100.0,
        target,
        p.time_horizon
    ));
    lines.push(format!("关键因素: {}", p.key_factors.join("；")));
    lines.push(format!("操作建议: {}", p.recommendation));
    lines.push(String::new());

    lines.push("【数据说明】".to_string());
    let included: Vec<&str> = outcome.included.iter().map(|d| d.label()).collect();
    lines.push(format!("已纳入评分 ({}): {}", included.len(), join_or_dash(&included)));
    let skipped: Vec<String> = outcome
        .skipped
        .iter()
        .map(|s| format!("{}（{}）", s.dimension.label(), s.reason))
        .collect();
    lines.push(format!("已跳过 ({}): {}", skipped.len(), join_or_dash(&skipped)));
    let display_only: Vec<&str> = report
        .dimensions
        .iter()
        .filter(|d| d.is_available() && !outcome.included.contains(&d.dimension))
        .map(|d| d.dimension.label())
        .collect();
    if !display_only.is_empty() {
        lines.push(format!("仅展示不计分: {}", display_only.join("、")));
    }
    lines.push("以上内容仅为数据分析结果，不构成投资建议。".to_string());

    lines.join("\n")
}

fn dimension_lines(index: usize, d: &DimensionResult) -> Vec<String> {
    let head = format!("{:>2}. {}（权重 {:.2}）", index, d.dimension.label(), d.weight);
    match (d.judgment(), d.unavailable_reason()) {
        (Some(j), _) => {
            let mut lines = vec![format!(
                "{} {} 信号 {:+.2} 贡献 {:+.4}",
                head,
                j.direction.label(),
                j.signal,
                d.contribution()
            )];
            if !j.summary.is_empty() {
                lines.push(format!("    {}", j.summary));
            }
            lines.extend(
                j.factors
                    .iter()
                    .map(|f| format!("    · {} ({:+.2})", f.description, f.score)),
            );
            lines
        }
        (None, reason) => vec![format!("{} 数据缺失，未纳入：{}", head, reason.unwrap_or("未知原因"))],
    }
}

fn join_or_dash<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join("、")
    }
}

/// 默认输出路径：`<dir>/<code>_<market>_<时间戳>.json`
pub fn default_output_path(dir: &Path, report: &CompositeReport) -> PathBuf {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{}_{}_{}.json", report.symbol.code(), report.symbol.market(), ts))
}

/// 写出结构化报告（含每个维度的原始数据与判断），自动创建目录
pub fn write_json(report: &CompositeReport, path: &Path) -> Result<PathBuf, ResearchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    fs::write(path, json)?;
    log::info!("[report] 报告已写入 {}", path.display());
    Ok(path.to_path_buf())
}
