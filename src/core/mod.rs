//! Infrastructure shared by every Daybook surface: storage, brokered
//! database access, configuration, errors and output rendering.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod report_db;
pub mod schemas;
pub mod store;
pub mod time;
