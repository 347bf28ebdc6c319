pub mod chip;
pub mod dimension;
pub mod fundamental;
pub mod market_data;
pub mod news;
pub mod report;
pub mod settings;
pub mod stock;
pub mod symbol;
pub mod technical;
