pub mod binance;
pub mod config;
pub mod csv_sink;
pub mod downloader;
pub mod error;
pub mod market_data;
pub mod model;
pub mod pipeline;
pub mod window_planner;
