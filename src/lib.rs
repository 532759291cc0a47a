//! Clockifyのtime entryを解析し、記録漏れや不審な記録をSlackに報告する。

pub mod batch;
pub mod calendar;
pub mod clockify;
pub mod config;
pub mod console;
pub mod daily_analyzer;
pub mod daily_command;
pub mod datetime;
pub mod directory;
pub mod duration;
pub mod error;
pub mod formatter;
pub mod logger;
pub mod monthly_analyzer;
pub mod monthly_command;
pub mod report;
pub mod slack;
pub mod sorter;
pub mod team;
pub mod time_entry;
