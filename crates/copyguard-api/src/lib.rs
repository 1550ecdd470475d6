pub mod dailymotion;
pub mod traits;
