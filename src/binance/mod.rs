//! Binance spot connector

pub mod auth;
pub mod messages;
pub mod rest;

pub use rest::BinanceRestClient;
