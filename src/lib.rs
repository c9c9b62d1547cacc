pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod logs;
pub mod notify;
pub mod report;
pub mod types;
pub mod util;
