// ABOUTME: Configuration module for the tutorial-slides application
// ABOUTME: Site layout, slide set definitions and environment variable handling

use crate::errors::{Result, SlideError};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_MARKDOWN_DIR: &str = "md";
pub const DEFAULT_OUTPUT_DIR: &str = "slides";

/// One batch of slide generation: a template paired with a source subdirectory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSet {
    /// Template path, resolved against the site root when relative
    pub template: PathBuf,
    /// Subdirectory name under the markdown root
    pub source_dir: String,
}

impl SlideSet {
    pub fn new(template: impl Into<PathBuf>, source_dir: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            source_dir: source_dir.into(),
        }
    }

    /// The language tracks shipped with the tutorials
    pub fn defaults() -> Vec<SlideSet> {
        vec![
            SlideSet::new("ocaml-slide.hbs", "ocaml"),
            SlideSet::new("prolog-slide.hbs", "prolog"),
            SlideSet::new("racket-slide.hbs", "racket"),
        ]
    }
}

impl FromStr for SlideSet {
    type Err = SlideError;

    /// Parse `TEMPLATE:DIR`, e.g. `ocaml-slide.hbs:ocaml`
    fn from_str(s: &str) -> Result<Self> {
        let (template, dir) = s
            .rsplit_once(':')
            .ok_or_else(|| SlideError::InvalidSlideSet(s.to_string()))?;
        let dir = dir.trim();
        if template.trim().is_empty() || dir.is_empty() || dir.contains(['/', '\\']) {
            return Err(SlideError::InvalidSlideSet(s.to_string()));
        }
        Ok(SlideSet::new(template.trim(), dir))
    }
}

/// Layout of a tutorial site
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Base directory templates are resolved against
    pub root: PathBuf,
    /// Directory holding one subdirectory per slide set
    pub markdown_root: PathBuf,
    /// Flat directory receiving the rendered pages
    pub output_dir: PathBuf,
    pub slide_sets: Vec<SlideSet>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl SiteConfig {
    /// Create a configuration with the standard layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            markdown_root: root.join(DEFAULT_MARKDOWN_DIR),
            output_dir: root.join(DEFAULT_OUTPUT_DIR),
            root,
            slide_sets: SlideSet::defaults(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_env_with_root(None)
    }

    /// Load configuration from environment variables, with `root` (when given)
    /// taking the place of `SLIDES_ROOT`
    pub fn from_env_with_root(root: Option<PathBuf>) -> Self {
        Self::from_vars(root, |key| env::var(key).ok())
    }

    fn from_vars(root: Option<PathBuf>, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| var(key).filter(|s| !s.is_empty());
        let root = root
            .or_else(|| var("SLIDES_ROOT").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self::new(root);
        if let Some(dir) = var("SLIDES_MARKDOWN_DIR") {
            config.markdown_root = config.root.join(dir);
        }
        if let Some(dir) = var("SLIDES_OUTPUT_DIR") {
            config.output_dir = config.root.join(dir);
        }
        config
    }

    /// Replace the slide sets, keeping the defaults when none are given
    pub fn with_slide_sets(mut self, slide_sets: Vec<SlideSet>) -> Self {
        if !slide_sets.is_empty() {
            self.slide_sets = slide_sets;
        }
        self
    }

    pub fn template_path(&self, slide_set: &SlideSet) -> PathBuf {
        resolve_against(&self.root, &slide_set.template)
    }

    pub fn source_path(&self, slide_set: &SlideSet) -> PathBuf {
        self.markdown_root.join(&slide_set.source_dir)
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
