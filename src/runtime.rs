// ABOUTME: Presentation runtime configuration for the tutorial-slides application
// ABOUTME: Describes the reveal.js deck and the thebe code-execution kernel it talks to

use crate::errors::{Result, SlideError};
use serde::Serialize;
use url::Url;

const MATHJAX_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.5/MathJax.js";
const MATHJAX_CONFIG: &str = "TeX-AMS_CHTML-full,Safe";
const OPTIONS_MARKER: &str = "__THEBE_OPTIONS__";

// The callbacks are plain JS, so they are merged into the serialized options
// instead of being part of them.
const INIT_SCRIPT: &str = r#"function thebe_init() {
    thebelab.bootstrap(Object.assign(__THEBE_OPTIONS__, {
        on_output_change: (node) => {
            const code = node.querySelector("code");
            if (code) {
                code.remove();
                const pre = document.createElement("pre");
                pre.innerHTML = code.innerHTML;
                node.querySelector("div.jp-OutputArea-output").appendChild(pre);
            }
            Reveal.layout();
        },
        on_execute: (cm) => {
            cm.display.input.blur();
        }
    }));
}

Reveal.initialize({
    hash: true,
    plugins: [ RevealMarkdown, RevealHighlight, RevealNotes, RevealMath ],
    keyboard: {
        39: 'next',
        37: 'prev'
    }
}).then(() => { thebe_init(); });
"#;

/// Settings for one language track's in-browser code execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationConfig {
    /// Jupyter kernel name, e.g. `racket`
    pub kernel: String,
    /// CodeMirror mode for the editable cells
    pub editor_mode: String,
    pub editor_theme: String,
    /// Host of the execution service
    pub host: String,
    /// Port of the execution service
    pub port: u16,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            kernel: "racket".to_string(),
            editor_mode: "text/x-scheme".to_string(),
            editor_theme: "monokai".to_string(),
            host: "localhost".to_string(),
            port: 16789,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    pub base_url: String,
    pub ws_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KernelOptions {
    pub name: String,
    pub kernel_name: String,
    pub path: String,
    pub server_settings: ServerSettings,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CodeMirrorConfig {
    pub mode: String,
    pub theme: String,
}

/// Options object handed to `thebelab.bootstrap`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThebeOptions {
    pub bootstrap: bool,
    pub request_kernel: bool,
    pub output_selector: String,
    pub kernel_options: KernelOptions,
    pub selector: String,
    pub mathjax_url: String,
    pub mathjax_config: String,
    pub code_mirror_config: CodeMirrorConfig,
}

impl PresentationConfig {
    /// HTTP and WebSocket endpoints of the execution service
    pub fn server_settings(&self) -> Result<ServerSettings> {
        let base = Url::parse(&format!("http://{}:{}", self.host, self.port))?;
        let mut ws = base.clone();
        ws.set_scheme("ws").map_err(|_| {
            SlideError::ConfigError(format!("cannot derive a WebSocket URL from {}", base))
        })?;

        Ok(ServerSettings {
            base_url: base.origin().ascii_serialization(),
            ws_url: ws.origin().ascii_serialization(),
        })
    }

    pub fn thebe_options(&self) -> Result<ThebeOptions> {
        if self.kernel.trim().is_empty() {
            return Err(SlideError::ConfigError("kernel name is empty".to_string()));
        }

        Ok(ThebeOptions {
            bootstrap: true,
            request_kernel: true,
            output_selector: "[data-output]".to_string(),
            kernel_options: KernelOptions {
                name: self.kernel.clone(),
                kernel_name: self.kernel.clone(),
                path: ".".to_string(),
                server_settings: self.server_settings()?,
            },
            selector: format!("[data-thebe-executable-{}]", self.kernel),
            mathjax_url: MATHJAX_URL.to_string(),
            mathjax_config: MATHJAX_CONFIG.to_string(),
            code_mirror_config: CodeMirrorConfig {
                mode: self.editor_mode.clone(),
                theme: self.editor_theme.clone(),
            },
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.thebe_options()?)?)
    }

    /// JS that starts the deck and then connects the executable cells
    pub fn render_init_script(&self) -> Result<String> {
        Ok(INIT_SCRIPT.replace(OPTIONS_MARKER, &self.to_json()?))
    }
}
