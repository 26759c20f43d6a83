// src/edgar/mod.rs
pub mod bundle;
pub mod catalog;
pub mod client;
pub mod models;
pub mod pacing;
pub mod resolver;
pub mod tickers;
