pub mod aliases;
pub mod catalog;
pub mod config;
pub mod error;
pub mod keywords;
pub mod models;
pub mod normalize;
pub mod recheck;
pub mod report;
pub mod scoring;
pub mod similarity;
pub mod storage;
