// ABOUTME: Slide template module for the tutorial-slides application
// ABOUTME: Compiles a Handlebars template once and renders it per tutorial name

use crate::errors::{Result, SlideError};
use handlebars::Handlebars;
use log::debug;
use serde_json::json;
use std::fs;
use std::path::Path;

/// Variable bound to the document's base name when rendering
pub const TUTORIAL_NAME_VAR: &str = "tutorial_name";

const TEMPLATE_NAME: &str = "slide";

/// A compiled slide template, reused for every document of a slide set
pub struct SlideTemplate {
    registry: Handlebars<'static>,
}

impl SlideTemplate {
    /// Read and compile a template file. The read is synchronous.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading template {:?}", path);
        let source = fs::read_to_string(path).map_err(|e| SlideError::TemplateLoadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_source(&source).map_err(|e| SlideError::TemplateLoadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Compile a template from its source text
    pub fn from_source(source: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_template_string(TEMPLATE_NAME, source)?;
        Ok(Self { registry })
    }

    /// Render the template for one tutorial
    pub fn render(&self, tutorial_name: &str) -> Result<String> {
        let context = json!({ TUTORIAL_NAME_VAR: tutorial_name });
        Ok(self.registry.render(TEMPLATE_NAME, &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_render_exact_output() {
        let template = SlideTemplate::from_source("<h1>{{tutorial_name}}</h1>").unwrap();
        assert_eq!(template.render("lists").unwrap(), "<h1>lists</h1>");
    }

    #[test]
    fn test_render_reuses_compiled_template() {
        let template =
            SlideTemplate::from_source("<section data-markdown=\"md/ocaml/{{tutorial_name}}.md\">")
                .unwrap();
        assert_eq!(
            template.render("intro").unwrap(),
            "<section data-markdown=\"md/ocaml/intro.md\">"
        );
        assert_eq!(
            template.render("lists").unwrap(),
            "<section data-markdown=\"md/ocaml/lists.md\">"
        );
    }

    #[test]
    fn test_unknown_variables_render_empty() {
        let template = SlideTemplate::from_source("[{{title}}]{{tutorial_name}}").unwrap();
        assert_eq!(template.render("x").unwrap(), "[]x");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(b"<title>{{tutorial_name}}</title>")
            .expect("Failed to write to temp file");

        let template = SlideTemplate::load(file.path()).unwrap();
        assert_eq!(template.render("cut").unwrap(), "<title>cut</title>");
    }

    #[test]
    fn test_load_missing_file_is_template_load_error() {
        let result = SlideTemplate::load(Path::new("/definitely/not/here.hbs"));
        assert!(matches!(result, Err(SlideError::TemplateLoadError { .. })));
    }

    #[test]
    fn test_invalid_syntax_is_rejected() {
        assert!(SlideTemplate::from_source("{{#if ready}}unclosed").is_err());
    }
}
