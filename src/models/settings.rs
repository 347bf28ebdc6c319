use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;
use crate::error::ResearchError;

pub const ENV_CONFIG_PATH: &str = "STOCK_RESEARCH_CONFIG";
const ENV_OUTPUT_DIR: &str = "STOCK_RESEARCH_OUTPUT_DIR";
const ENV_FETCH_TIMEOUT: &str = "STOCK_RESEARCH_FETCH_TIMEOUT_SECS";
const ENV_TOTAL_TIMEOUT: &str = "STOCK_RESEARCH_TOTAL_TIMEOUT_SECS";
const ENV_MAX_RETRIES: &str = "STOCK_RESEARCH_MAX_RETRIES";
const ENV_LOOKBACK_DAYS: &str = "STOCK_RESEARCH_LOOKBACK_DAYS";
const ENV_EASTMONEY_UT: &str = "EASTMONEY_UT";
const ENV_QGQP_B_ID: &str = "EASTMONEY_QGQP_B_ID";
/// 单次请求的最大重试次数
pub const MAX_RETRIES_CAP: u32 = 5;

/// 研究流程配置：默认值 → JSON 配置文件 → 环境变量，逐层覆盖
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub weights: DimensionWeights,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub chip: ChipSettings,
}

fn default_output_dir() -> PathBuf { PathBuf::from("./reports") }
fn default_lookback_days() -> u32 { 250 }

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            lookback_days: default_lookback_days(),
            provider: ProviderSettings::default(),
            weights: DimensionWeights::default(),
            scoring: ScoringSettings::default(),
            chip: ChipSettings::default(),
        }
    }
}

impl ResearchSettings {
    /// 读取配置：显式路径优先，其次 `STOCK_RESEARCH_CONFIG`，最后叠加环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ResearchError> {
        let env_path = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(env_path);

        let mut settings = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ResearchError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResearchError::Config(format!("读取配置文件 {} 失败: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| ResearchError::Config(format!("解析配置文件 {} 失败: {}", path.display(), e)))
    }

    /// 用环境变量覆盖；`lookup` 便于测试时注入
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ResearchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = parse_env(&lookup, ENV_FETCH_TIMEOUT)? {
            self.provider.fetch_timeout_secs = v;
        }
        if let Some(v) = parse_env(&lookup, ENV_TOTAL_TIMEOUT)? {
            self.provider.total_timeout_secs = v;
        }
        if let Some(v) = parse_env(&lookup, ENV_MAX_RETRIES)? {
            self.provider.max_retries = v;
        }
        if let Some(v) = parse_env(&lookup, ENV_LOOKBACK_DAYS)? {
            self.lookback_days = v;
        }
        if let Some(v) = lookup(ENV_EASTMONEY_UT).filter(|v| !v.trim().is_empty()) {
            self.provider.eastmoney_ut = v;
        }
        if let Some(v) = lookup(ENV_QGQP_B_ID).filter(|v| !v.trim().is_empty()) {
            self.provider.qgqp_b_id = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ResearchError> {
        if self.lookback_days < 30 {
            return Err(ResearchError::Config(format!(
                "lookback_days 至少为 30（当前 {}）",
                self.lookback_days
            )));
        }
        if self.provider.max_retries > MAX_RETRIES_CAP {
            return Err(ResearchError::Config(format!(
                "max_retries 不能超过 {}（当前 {}）",
                MAX_RETRIES_CAP, self.provider.max_retries
            )));
        }
        if self.scoring.min_score >= self.scoring.max_score {
            return Err(ResearchError::Config("评分区间 min_score 必须小于 max_score".to_string()));
        }
        if self.scoring.bearish_threshold > self.scoring.bullish_threshold {
            return Err(ResearchError::Config("看空阈值不能高于看多阈值".to_string()));
        }
        if let Some(d) = Dimension::ALL.iter().find(|d| self.weights.get(**d) < 0.0) {
            return Err(ResearchError::Config(format!("维度 {} 的权重不能为负", d.key())));
        }
        if self.chip.windows.is_empty() {
            return Err(ResearchError::Config("筹码趋势窗口不能为空".to_string()));
        }
        Ok(())
    }
}

fn parse_env<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ResearchError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ResearchError::Config(format!("环境变量 {}={} 不是合法数值", key, raw))),
    }
}

/// 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_push2_base")]
    pub push2_base: String,
    #[serde(default = "default_push2his_base")]
    pub push2his_base: String,
    #[serde(default = "default_datacenter_base")]
    pub datacenter_base: String,
    #[serde(default = "default_search_base")]
    pub search_base: String,
    #[serde(default = "default_tencent_quote_base")]
    pub tencent_quote_base: String,
    #[serde(default = "default_tencent_kline_base")]
    pub tencent_kline_base: String,
    #[serde(default = "default_ut")]
    pub eastmoney_ut: String,
    #[serde(default)]
    pub qgqp_b_id: String,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 个股新闻条数
    #[serde(default = "default_news_limit")]
    pub news_limit: usize,
}

fn default_push2_base() -> String { "https://push2.eastmoney.com".to_string() }
fn default_push2his_base() -> String { "https://push2his.eastmoney.com".to_string() }
fn default_datacenter_base() -> String { "https://datacenter-web.eastmoney.com".to_string() }
fn default_search_base() -> String { "https://search-api-web.eastmoney.com".to_string() }
fn default_tencent_quote_base() -> String { "http://qt.gtimg.cn".to_string() }
fn default_tencent_kline_base() -> String { "https://web.ifzq.gtimg.cn".to_string() }
fn default_ut() -> String { "bd1d9ddb04089700cf9c27f6f7426281".to_string() }
fn default_fetch_timeout() -> u64 { 15 }
fn default_total_timeout() -> u64 { 60 }
fn default_max_retries() -> u32 { 2 }
fn default_news_limit() -> usize { 10 }

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            push2_base: default_push2_base(),
            push2his_base: default_push2his_base(),
            datacenter_base: default_datacenter_base(),
            search_base: default_search_base(),
            tencent_quote_base: default_tencent_quote_base(),
            tencent_kline_base: default_tencent_kline_base(),
            eastmoney_ut: default_ut(),
            qgqp_b_id: String::new(),
            fetch_timeout_secs: default_fetch_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_retries: default_max_retries(),
            news_limit: default_news_limit(),
        }
    }
}

impl ProviderSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs.max(1))
    }

    /// 所有地址指向同一个测试服务器
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            push2_base: base.clone(),
            push2his_base: base.clone(),
            datacenter_base: base.clone(),
            search_base: base.clone(),
            tencent_quote_base: base.clone(),
            tencent_kline_base: base,
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// 各维度权重，权重为 0 的维度照常展示但不参与打分
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionWeights {
    #[serde(default = "w_technical")]
    pub technical: f64,
    #[serde(default = "w_fundamental")]
    pub fundamental: f64,
    #[serde(default = "w_fund_flow")]
    pub fund_flow: f64,
    #[serde(default)]
    pub news: f64,
    #[serde(default = "w_chip")]
    pub chip: f64,
    #[serde(default = "w_005")]
    pub dragon_tiger: f64,
    #[serde(default = "w_005")]
    pub margin: f64,
    #[serde(default = "w_005")]
    pub northbound: f64,
    #[serde(default = "w_block_trade")]
    pub block_trade: f64,
    #[serde(default = "w_005")]
    pub shareholder: f64,
    #[serde(default = "w_005")]
    pub institution: f64,
    #[serde(default = "w_005")]
    pub restricted_shares: f64,
    #[serde(default)]
    pub industry_compare: f64,
    #[serde(default)]
    pub dividend: f64,
}

fn w_technical() -> f64 { 0.35 }
fn w_fundamental() -> f64 { 0.30 }
fn w_fund_flow() -> f64 { 0.10 }
fn w_chip() -> f64 { 0.20 }
fn w_005() -> f64 { 0.05 }
fn w_block_trade() -> f64 { 0.03 }

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            technical: w_technical(),
            fundamental: w_fundamental(),
            fund_flow: w_fund_flow(),
            news: 0.0,
            chip: w_chip(),
            dragon_tiger: w_005(),
            margin: w_005(),
            northbound: w_005(),
            block_trade: w_block_trade(),
            shareholder: w_005(),
            institution: w_005(),
            restricted_shares: w_005(),
            industry_compare: 0.0,
            dividend: 0.0,
        }
    }
}

impl DimensionWeights {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Technical => self.technical,
            Dimension::Fundamental => self.fundamental,
            Dimension::FundFlow => self.fund_flow,
            Dimension::News => self.news,
            Dimension::Chip => self.chip,
            Dimension::DragonTiger => self.dragon_tiger,
            Dimension::Margin => self.margin,
            Dimension::Northbound => self.northbound,
            Dimension::BlockTrade => self.block_trade,
            Dimension::Shareholder => self.shareholder,
            Dimension::Institution => self.institution,
            Dimension::RestrictedShares => self.restricted_shares,
            Dimension::IndustryCompare => self.industry_compare,
            Dimension::Dividend => self.dividend,
        }
    }

    /// 全部维度置 0，测试时按需开启
    pub fn zero() -> Self {
        Self {
            technical: 0.0,
            fundamental: 0.0,
            fund_flow: 0.0,
            news: 0.0,
            chip: 0.0,
            dragon_tiger: 0.0,
            margin: 0.0,
            northbound: 0.0,
            block_trade: 0.0,
            shareholder: 0.0,
            institution: 0.0,
            restricted_shares: 0.0,
            industry_compare: 0.0,
            dividend: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.get(*d)).sum()
    }
}

/// 综合评分区间与分类阈值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_base")]
    pub base_score: f64,
    #[serde(default)]
    pub min_score: f64,
    #[serde(default = "default_max")]
    pub max_score: f64,
    /// 严格大于该值为看多
    #[serde(default = "default_bullish")]
    pub bullish_threshold: f64,
    /// 严格小于该值为看空
    #[serde(default = "default_bearish")]
    pub bearish_threshold: f64,
}

fn default_base() -> f64 { 0.5 }
fn default_max() -> f64 { 1.0 }
fn default_bullish() -> f64 { 0.6 }
fn default_bearish() -> f64 { 0.4 }

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            base_score: default_base(),
            min_score: 0.0,
            max_score: default_max(),
            bullish_threshold: default_bullish(),
            bearish_threshold: default_bearish(),
        }
    }
}

/// 筹码分布计算与行为判断参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChipSettings {
    /// 短/中/长期窗口（交易日）
    #[serde(default = "default_windows")]
    pub windows: Vec<usize>,
    /// 集中度相对斜率阈值（每日）
    #[serde(default = "default_slope")]
    pub concentration_slope_threshold: f64,
    /// 获利比例斜率阈值（每日）
    #[serde(default = "default_slope")]
    pub winner_slope_threshold: f64,
    #[serde(default = "default_min_points")]
    pub min_window_points: usize,
    /// 价格网格档数
    #[serde(default = "default_buckets")]
    pub price_buckets: usize,
    /// 输出的筹码序列长度（最近 N 个交易日）
    #[serde(default = "default_series_len")]
    pub series_len: usize,
}

fn default_windows() -> Vec<usize> { vec![5, 10, 20] }
fn default_slope() -> f64 { 0.005 }
fn default_min_points() -> usize { 3 }
fn default_buckets() -> usize { 150 }
fn default_series_len() -> usize { 90 }

impl Default for ChipSettings {
    fn default() -> Self {
        Self {
            windows: default_windows(),
            concentration_slope_threshold: default_slope(),
            winner_slope_threshold: default_slope(),
            min_window_points: default_min_points(),
            price_buckets: default_buckets(),
            series_len: default_series_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_weights() {
        let w = DimensionWeights::default();
        assert_eq!(w.get(Dimension::Technical), 0.35);
        assert_eq!(w.get(Dimension::BlockTrade), 0.03);
        assert_eq!(w.get(Dimension::News), 0.0);
        assert!((w.total() - 1.28).abs() < 1e-9);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"lookback_days": 120, "weights": {{"technical": 0.5}}, "provider": {{"max_retries": 0}}}}"#
        )
        .unwrap();

        let s = ResearchSettings::from_file(file.path()).unwrap();
        assert_eq!(s.lookback_days, 120);
        assert_eq!(s.weights.technical, 0.5);
        // 未出现的字段保持默认
        assert_eq!(s.weights.fundamental, 0.30);
        assert_eq!(s.provider.max_retries, 0);
        assert_eq!(s.provider.fetch_timeout_secs, 15);
        assert_eq!(s.chip.windows, vec![5, 10, 20]);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("STOCK_RESEARCH_OUTPUT_DIR", "/tmp/out"),
            ("STOCK_RESEARCH_FETCH_TIMEOUT_SECS", "5"),
            ("STOCK_RESEARCH_LOOKBACK_DAYS", "60"),
            ("EASTMONEY_QGQP_B_ID", "abc123"),
        ]
        .into_iter()
        .collect();

        let mut s = ResearchSettings::default();
        s.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(s.provider.fetch_timeout_secs, 5);
        assert_eq!(s.lookback_days, 60);
        assert_eq!(s.provider.qgqp_b_id, "abc123");
        assert_eq!(s.provider.eastmoney_ut, default_ut());
    }

    #[test]
    fn test_invalid_env_value_rejected() {
        let mut s = ResearchSettings::default();
        let err = s
            .apply_env(|k| (k == "STOCK_RESEARCH_MAX_RETRIES").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));
    }

    #[test]
    fn test_max_retries_capped() {
        let mut s = ResearchSettings::default();
        s.apply_env(|k| (k == "STOCK_RESEARCH_MAX_RETRIES").then(|| "4294967295".to_string()))
            .unwrap();
        assert_eq!(s.provider.max_retries, u32::MAX);
        assert!(matches!(s.validate(), Err(ResearchError::Config(_))));

        s.provider.max_retries = MAX_RETRIES_CAP;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut s = ResearchSettings::default();
        assert!(s.validate().is_ok());
        s.weights.margin = -0.1;
        assert!(s.validate().is_err());
    }
}
