pub mod analyzer;
pub mod chip_analysis;
pub mod chip_distribution;
pub mod collector;
pub mod datacenter;
pub mod eastmoney;
pub mod fundamental;
pub mod history_kline;
pub mod judgments;
pub mod news_service;
pub mod provider;
pub mod report;
pub mod scoring;
pub mod stock_data;
pub mod technical_indicators;
