pub mod run_report;
pub mod summary;
