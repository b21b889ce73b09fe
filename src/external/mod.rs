pub mod binance;
pub mod price_provider;
