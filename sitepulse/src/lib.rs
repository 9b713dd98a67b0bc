// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    UrlSource, exit_code, load_urls_from_file, load_urls_from_source, parse_url_line,
};

// Re-export orchestration from sitepulse-core
pub use sitepulse_core::{
    CheckOptions, CheckSummary, ReportFormat, SitemapOptions, StatusCallback, execute_check,
    execute_resolve,
};
