use std::path::PathBuf;

use crate::error::ResearchError;
use crate::models::report::CompositeReport;
use crate::models::settings::ResearchSettings;
use crate::models::symbol::{Market, Symbol};
use crate::services::analyzer::StockAnalyzer;
use crate::services::provider::MarketDataProvider;
use crate::services::report::{default_output_path, write_json};

/// 一次分析请求（来自命令行参数）
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub symbol: String,
    pub market: Option<String>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub report: CompositeReport,
    pub written: Option<PathBuf>,
}

/// 校验代码后执行完整研究流程；指定 `--output` 或 `--json` 时写出结构化报告
pub async fn analyze_stock(
    request: &AnalyzeRequest,
    settings: &ResearchSettings,
    provider: &dyn MarketDataProvider,
) -> Result<AnalyzeOutcome, ResearchError> {
    let market = request.market.as_deref().map(str::parse::<Market>).transpose()?;
    let symbol = Symbol::parse(&request.symbol, market)?;
    log::info!("[analyze] 开始分析 {}", symbol);

    let report = StockAnalyzer::new(provider, settings).analyze(&symbol).await?;

    let target = match &request.output {
        Some(path) => Some(path.clone()),
        None if request.json => Some(default_output_path(&settings.output_dir, &report)),
        None => None,
    };
    let written = match target {
        Some(path) => Some(write_json(&report, &path)?),
        None => None,
    };

    Ok(AnalyzeOutcome { report, written })
}
