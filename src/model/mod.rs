pub mod candle;
pub mod interval;
