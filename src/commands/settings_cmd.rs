use std::path::Path;

use crate::error::ResearchError;
use crate::models::settings::ResearchSettings;

/// 加载配置并叠加命令行覆盖项
pub fn load_settings(config: Option<&Path>, lookback_days: Option<u32>) -> Result<ResearchSettings, ResearchError> {
    let mut settings = ResearchSettings::load(config)?;
    if let Some(days) = lookback_days {
        settings.lookback_days = days;
        settings.validate()?;
    }
    log::debug!(
        "[settings] 回看 {} 天，单次请求 {}s，总限时 {}s，重试 {} 次",
        settings.lookback_days,
        settings.provider.fetch_timeout_secs,
        settings.provider.total_timeout_secs,
        settings.provider.max_retries
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookback_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"lookback_days": 90}"#).unwrap();

        let settings = load_settings(Some(&path), Some(200)).unwrap();
        assert_eq!(settings.lookback_days, 200);

        let err = load_settings(Some(&path), Some(10)).unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_settings(Some(Path::new("/nonexistent/stock-research.json")), None).unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));
    }
}
