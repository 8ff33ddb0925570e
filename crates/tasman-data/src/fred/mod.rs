//! FRED (Federal Reserve Economic Data) macro provider.

pub mod client;

pub use client::FredClient;
