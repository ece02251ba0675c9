// ABOUTME: Slide builder module for the tutorial-slides application
// ABOUTME: Renders every Markdown tutorial of a slide set into a flat output directory

use crate::config::{SiteConfig, SlideSet};
use crate::errors::{Result, SlideError};
use crate::template::SlideTemplate;
use crate::utils;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinSet;

const MARKDOWN_SUFFIX: &str = ".md";

/// A page that could not be produced. Never fatal to the build.
#[derive(Debug)]
pub struct FailedPage {
    pub path: PathBuf,
    pub error: SlideError,
}

/// Outcome of a build: pages written and pages that failed
#[derive(Debug, Default)]
pub struct BuildReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<FailedPage>,
}

impl BuildReport {
    fn merge(&mut self, other: BuildReport) {
        self.written.extend(other.written);
        self.failed.extend(other.failed);
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Tutorial name for a directory entry, or `None` when it is not Markdown.
///
/// Strips exactly the trailing `.md`, so `notes.v2.md` becomes `notes.v2`.
pub fn tutorial_name(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(MARKDOWN_SUFFIX)
}

/// Output file name for a tutorial: `{source_dir}-{tutorial_name}.html`
pub fn page_file_name(source_dir: &str, tutorial_name: &str) -> String {
    format!("{}-{}.html", source_dir, tutorial_name)
}

/// Entry names of a directory. Names that are not valid UTF-8 are skipped.
async fn list_entries(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!("Skipping non UTF-8 entry {:?}", raw),
        }
    }
    Ok(names)
}

/// Build one slide set.
///
/// Fails only when the source directory cannot be listed or the template
/// cannot be loaded. Individual pages that fail to render or write are
/// logged and recorded in the report. The output directory must already exist.
pub async fn build_slide_set(config: &SiteConfig, slide_set: &SlideSet) -> Result<BuildReport> {
    let source_dir = config.source_path(slide_set);
    let entries = list_entries(&source_dir)
        .await
        .map_err(|source| SlideError::ListingError {
            dir: source_dir.clone(),
            source,
        })?;

    let mut report = BuildReport::default();
    let mut writes = JoinSet::new();
    {
        let template = SlideTemplate::load(&config.template_path(slide_set))?;

        for file_name in &entries {
            let Some(name) = tutorial_name(file_name) else {
                continue;
            };

            info!("generating slide for {}", name);
            let output = config
                .output_dir
                .join(page_file_name(&slide_set.source_dir, name));

            match template.render(name) {
                Ok(html) => {
                    writes.spawn(async move {
                        let result = fs::write(&output, html).await;
                        (output, result)
                    });
                }
                Err(e) => {
                    error!("Failed to render {:?}: {}", output, e);
                    report.failed.push(FailedPage {
                        path: output,
                        error: e,
                    });
                }
            }
        }
    }

    while let Some(joined) = writes.join_next().await {
        let (path, result) = joined?;
        match result {
            Ok(()) => {
                info!("File written successfully: {:?}", path);
                report.written.push(path);
            }
            Err(e) => {
                error!("Failed to write {:?}: {}", path, e);
                report.failed.push(FailedPage {
                    path,
                    error: SlideError::FileError(e),
                });
            }
        }
    }

    report.written.sort();
    Ok(report)
}

/// Build every configured slide set.
///
/// Creates the output directory first, then starts all slide sets at once.
/// The first fatal error aborts the sets still running and is returned.
pub async fn build_site(config: &SiteConfig) -> Result<BuildReport> {
    utils::ensure_directory_exists(&config.output_dir)?;

    let shared = Arc::new(config.clone());
    let mut sets = JoinSet::new();
    for slide_set in config.slide_sets.iter().cloned() {
        let config = Arc::clone(&shared);
        sets.spawn(async move { build_slide_set(&config, &slide_set).await });
    }

    let mut report = BuildReport::default();
    while let Some(joined) = sets.join_next().await {
        report.merge(joined??);
    }

    report.written.sort();
    info!(
        "Built {} slide pages into {:?} ({} failed)",
        report.written.len(),
        config.output_dir,
        report.failed.len()
    );
    Ok(report)
}
