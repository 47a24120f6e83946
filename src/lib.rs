pub mod ai;
pub mod config;
pub mod logging;
pub mod storage;
