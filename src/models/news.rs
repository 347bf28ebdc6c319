use serde::{Deserialize, Serialize};

/// 个股新闻条目（东方财富搜索接口）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    /// 唯一标识
    pub id: String,
    pub title: String,
    /// 内容摘要
    pub summary: String,
    /// 来源媒体
    pub source: String,
    /// 发布时间 "2024-11-05 09:31:00"
    pub publish_time: String,
    pub url: String,
}

/// 新闻维度汇总：仅用于报告展示，不参与打分
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsDigest {
    pub news_count: usize,
    pub latest_time: Option<String>,
    pub headlines: Vec<String>,
}

impl NewsDigest {
    pub fn from_items(items: &[NewsItem], max_headlines: usize) -> Self {
        Self {
            news_count: items.len(),
            latest_time: items.iter().map(|n| n.publish_time.clone()).max(),
            headlines: items.iter().take(max_headlines).map(|n| n.title.clone()).collect(),
        }
    }
}
