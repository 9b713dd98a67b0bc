pub mod banner;
pub mod check;
pub mod report;
pub mod summary;

pub use banner::print_banner;
pub use check::{
    CheckOptions, SitemapOptions, StatusCallback, execute_check, execute_check_with,
    execute_resolve,
};
pub use report::{ReportFormat, save_report};
pub use summary::CheckSummary;
