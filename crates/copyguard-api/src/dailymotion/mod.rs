pub mod client;
pub mod error;
pub mod types;

pub use client::DailymotionClient;
pub use error::DailymotionError;
