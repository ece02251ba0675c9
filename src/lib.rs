// ABOUTME: Library module for the tutorial-slides program.
// ABOUTME: Builds slide pages from Markdown tutorials and serves them during editing.

pub mod builder;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod template;
pub mod utils;
pub mod watch;

// Reexport common types and functions
pub use builder::{BuildReport, FailedPage, build_site, build_slide_set, page_file_name};
pub use config::{SiteConfig, SlideSet};
pub use errors::{Result, SlideError};
pub use runtime::PresentationConfig;
pub use template::SlideTemplate;
pub use watch::{WatchConfig, serve};
