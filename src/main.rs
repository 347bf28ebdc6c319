use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stock_research::commands::analyze_cmd::{analyze_stock, AnalyzeRequest};
use stock_research::commands::settings_cmd::load_settings;
use stock_research::error::ResearchError;
use stock_research::services::eastmoney::EastMoneyProvider;

/// A 股 / 港股多维度研究报告
#[derive(Parser, Debug)]
#[command(name = "stock-research", version, about = "多维度个股研究：采集 14 类数据，加权评分并生成报告")]
struct Cli {
    /// 股票代码，如 600519、sh600519、hk00700
    symbol: String,

    /// 市场：sh | sz | hk（六位 A 股代码可省略）
    #[arg(short, long)]
    market: Option<String>,

    /// 结构化报告输出路径
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 配置文件（JSON）
    #[arg(short, long, env = "STOCK_RESEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// 历史数据回看天数
    #[arg(long)]
    lookback_days: Option<u32>,

    /// 未指定 --output 时也写出 JSON 报告到输出目录
    #[arg(long)]
    json: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(err: &ResearchError) -> u8 {
    match err {
        ResearchError::InvalidSymbol { .. } => 2,
        ResearchError::NoData { .. } => 3,
        ResearchError::Config(_) => 4,
        ResearchError::Io(_) => 5,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match load_settings(cli.config.as_deref(), cli.lookback_days) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(exit_code(&e));
        }
    };
    let provider = match EastMoneyProvider::new(&settings) {
        Ok(p) => p,
        Err(e) => {
            log::error!("初始化数据源失败: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let request = AnalyzeRequest {
        symbol: cli.symbol,
        market: cli.market,
        output: cli.output,
        json: cli.json,
    };
    match analyze_stock(&request, &settings, &provider).await {
        Ok(outcome) => {
            println!("{}", outcome.report.narrative);
            if let Some(path) = outcome.written {
                eprintln!("报告已保存: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let ResearchError::NoData { skipped } = &e {
                for (dimension, reason) in skipped {
                    log::warn!("  {}: {}", dimension.label(), reason);
                }
            }
            log::error!("{}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
