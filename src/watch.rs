// ABOUTME: Development server for the tutorial-slides application
// ABOUTME: Serves the site, rebuilds slides on source changes and live-reloads browsers

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fs;
use std::io::Cursor;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use glob::{MatchOptions, Pattern};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_full::{DebounceEventResult, new_debouncer};
use tiny_http::{Header, Response, Server, StatusCode};
use tokio::runtime::Handle;
use tungstenite::{Message, WebSocket};

use crate::builder;
use crate::config::SiteConfig;
use crate::errors::{Result, SlideError};
use crate::utils;

/// Paths, relative to the served root, whose changes trigger a rebuild and reload
pub const DEFAULT_WATCH_PATTERNS: &[&str] =
    &["*.html", "*.md", "*.hbs", "md/*/*.md", "index.html"];

pub const PRIVATE_NETWORK_HEADER: &str = "Access-Control-Allow-Private-Network";

const RELOAD_MESSAGE: &str = "reload";

/// Upper bound on a reload send, so a stalled browser cannot hold the client list
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for the development server
pub struct WatchConfig {
    /// Site layout; its root is also the directory being served
    pub site: SiteConfig,

    /// Port for the HTTP server
    pub port: u16,

    /// Port for the live-reload WebSocket
    pub livereload_port: u16,

    /// Debounce time in milliseconds
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            port: 8000,
            livereload_port: 35729,
            debounce_ms: 200,
        }
    }
}

/// Decides which filesystem events are worth a rebuild
pub struct WatchFilter {
    root: PathBuf,
    output_dir: PathBuf,
    patterns: Vec<Pattern>,
}

impl WatchFilter {
    pub fn new(root: PathBuf, output_dir: PathBuf, patterns: &[&str]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    SlideError::ConfigError(format!("Invalid watch pattern {:?}: {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root,
            output_dir,
            patterns,
        })
    }

    /// Generated pages never count, or every build would trigger the next one
    pub fn is_relevant(&self, path: &Path) -> bool {
        if path.starts_with(&self.output_dir) {
            return false;
        }
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };

        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(&relative, options))
    }
}

/// Connected live-reload browsers
#[derive(Clone, Default)]
pub struct LiveReload {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
}

impl LiveReload {
    /// Accept WebSocket clients on `127.0.0.1:{port}` in a background thread
    pub fn start(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| {
            SlideError::ServerError(format!("Failed to bind live-reload port {}: {}", port, e))
        })?;
        let live_reload = LiveReload::default();
        let clients = Arc::clone(&live_reload.clients);

        thread::spawn(move || {
            info!("Live reload listening on ws://localhost:{}", port);
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!("Live reload connection failed: {}", e);
                        continue;
                    }
                };
                if let Err(e) = stream.set_write_timeout(Some(WRITE_TIMEOUT)) {
                    warn!("Could not set live reload write timeout: {}", e);
                }
                match tungstenite::accept(stream) {
                    Ok(socket) => {
                        debug!("Live reload client connected");
                        clients.lock().push(socket);
                    }
                    Err(e) => warn!("Live reload handshake failed: {}", e),
                }
            }
        });

        Ok(live_reload)
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Tell every browser to reload, dropping the ones that went away
    pub fn broadcast(&self) {
        let mut clients = self.clients.lock();
        clients.retain_mut(|socket| {
            socket
                .send(Message::Text(RELOAD_MESSAGE.to_string()))
                .is_ok()
        });
        info!("Reload sent to {} client(s)", clients.len());
    }
}

/// Browser-side half of live reload
pub fn livereload_script(port: u16) -> String {
    format!(
        "<script>(function () {{ var ws = new WebSocket(\"ws://\" + location.hostname + \":{}\"); \
         ws.onmessage = function (e) {{ if (e.data === \"{}\") {{ location.reload(); }} }}; }})();</script>",
        port, RELOAD_MESSAGE
    )
}

/// Insert the script before the last `</body>`, or append it
pub fn inject_livereload(html: &str, script: &str) -> String {
    match html.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..idx]);
            out.push_str(script);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{}{}", html, script),
    }
}

/// A response ready to be sent, kept apart from tiny_http for testing
#[derive(Debug)]
pub struct ServedFile {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl ServedFile {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into().into_bytes(),
        }
    }
}

/// Resolve and read a request path under `root`
pub fn serve_path(root: &Path, url_path: &str, livereload_port: u16) -> ServedFile {
    let Some(file_path) = utils::resolve_request_path(root, url_path) else {
        return ServedFile::text(403, "403 Forbidden");
    };
    debug!("Request for {:?} -> {:?}", url_path, file_path);

    if !file_path.is_file() {
        return ServedFile::text(404, "404 Not Found");
    }

    match fs::read(&file_path) {
        Ok(content) => {
            let content_type = utils::content_type_for(&file_path);
            let body = if content_type.starts_with("text/html") {
                let html = String::from_utf8_lossy(&content);
                inject_livereload(&html, &livereload_script(livereload_port)).into_bytes()
            } else {
                content
            };
            ServedFile {
                status: 200,
                content_type,
                body,
            }
        }
        Err(e) => {
            error!("Failed to read file {:?}: {}", file_path, e);
            ServedFile::text(500, format!("Failed to read file: {}", e))
        }
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn into_response(served: ServedFile) -> Response<Cursor<Vec<u8>>> {
    let mut response =
        Response::from_data(served.body).with_status_code(StatusCode(served.status));
    for h in [
        header("Content-Type", served.content_type),
        header(PRIVATE_NETWORK_HEADER, "true"),
    ]
    .into_iter()
    .flatten()
    {
        response.add_header(h);
    }
    response
}

/// Start a simple HTTP server for the site root
fn start_server(root: PathBuf, port: u16, livereload_port: u16) -> Result<()> {
    let server = Server::http(("127.0.0.1", port))
        .map_err(|e| SlideError::ServerError(format!("Failed to start HTTP server: {}", e)))?;

    thread::spawn(move || {
        info!("HTTP server listening on http://localhost:{}", port);
        for request in server.incoming_requests() {
            let served = serve_path(&root, request.url(), livereload_port);
            if let Err(e) = request.respond(into_response(served)) {
                error!("Failed to send response: {}", e);
            }
        }
    });

    Ok(())
}

fn rebuild(runtime: &Handle, site: &SiteConfig) {
    match runtime.block_on(builder::build_site(site)) {
        Ok(report) if report.is_clean() => info!("Rebuilt {} slide pages", report.written.len()),
        Ok(report) => warn!(
            "Rebuilt {} slide pages, {} failed",
            report.written.len(),
            report.failed.len()
        ),
        Err(e) => error!("Failed to rebuild slides: {}", e),
    }
}

/// Build the slides, serve the site and keep rebuilding on changes.
///
/// Must be called outside the tokio runtime that `runtime` belongs to.
/// Only returns on start-up errors or when the watcher shuts down.
pub fn serve(config: WatchConfig, runtime: &Handle) -> Result<()> {
    utils::validate_directory_exists(&config.site.root)?;

    // Initial build; a fatal error here stops the server from starting
    let report = runtime.block_on(builder::build_site(&config.site))?;
    info!("Generated {} slide pages", report.written.len());

    let root = utils::get_absolute_path(&config.site.root)?;
    let output_dir = utils::get_absolute_path(&config.site.output_dir)?;
    let filter = WatchFilter::new(root.clone(), output_dir, DEFAULT_WATCH_PATTERNS)?;

    let live_reload = LiveReload::start(config.livereload_port)?;
    start_server(root.clone(), config.port, config.livereload_port)?;

    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms), None, tx)?;
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| {
            SlideError::WatchError(format!("Failed to start watching {:?}: {}", root, e))
        })?;

    info!("Watching for changes in {:?}", root);
    println!(
        "Serving {:?} on http://localhost:{} (Press Ctrl+C to stop)",
        root, config.port
    );

    for result in rx {
        match result {
            Ok(events) => {
                let relevant = events
                    .iter()
                    .flat_map(|event| event.paths.iter())
                    .find(|path| filter.is_relevant(path));

                if let Some(path) = relevant {
                    info!("Change detected in {:?}", path);
                    rebuild(runtime, &config.site);
                    live_reload.broadcast();
                }
            }
            Err(errors) => {
                for e in errors {
                    error!("Watch error: {:?}", e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filter() -> WatchFilter {
        WatchFilter::new(
            PathBuf::from("/site"),
            PathBuf::from("/site/slides"),
            DEFAULT_WATCH_PATTERNS,
        )
        .unwrap()
    }

    #[test]
    fn test_markdown_sources_are_relevant() {
        let filter = filter();
        assert!(filter.is_relevant(Path::new("/site/md/ocaml/intro.md")));
        assert!(filter.is_relevant(Path::new("/site/README.md")));
        assert!(filter.is_relevant(Path::new("/site/index.html")));
        assert!(filter.is_relevant(Path::new("/site/ocaml-slide.hbs")));
    }

    #[test]
    fn test_other_paths_are_ignored() {
        let filter = filter();
        assert!(!filter.is_relevant(Path::new("/site/slides/ocaml-intro.html")));
        assert!(!filter.is_relevant(Path::new("/site/md/ocaml/deep/nested.md")));
        assert!(!filter.is_relevant(Path::new("/site/md/ocaml/image.png")));
        assert!(!filter.is_relevant(Path::new("/elsewhere/index.html")));
        assert!(!filter.is_relevant(Path::new("/site/css/theme.css")));
    }

    #[test]
    fn test_inject_livereload_before_body_close() {
        let html = "<html><body><p>x</p></body></html>";
        let out = inject_livereload(html, "<script>r</script>");
        assert_eq!(out, "<html><body><p>x</p><script>r</script></body></html>");
    }

    #[test]
    fn test_inject_livereload_appends_without_body() {
        assert_eq!(inject_livereload("<p>x</p>", "<s/>"), "<p>x</p><s/>");
    }

    #[test]
    fn test_livereload_script_uses_port() {
        let script = livereload_script(35729);
        assert!(script.contains(":35729"));
        assert!(script.contains("location.reload()"));
    }

    #[test]
    fn test_serve_path_html_gets_reload_script() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("index.html"), "<body>hi</body>").unwrap();

        let served = serve_path(temp_dir.path(), "/", 4242);
        assert_eq!(served.status, 200);
        assert_eq!(served.content_type, "text/html; charset=utf-8");
        let body = String::from_utf8(served.body).unwrap();
        assert!(body.starts_with("<body>hi<script>"));
        assert!(body.contains(":4242"));
    }

    #[test]
    fn test_serve_path_markdown_is_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let md_dir = temp_dir.path().join("md").join("ocaml");
        fs::create_dir_all(&md_dir).unwrap();
        fs::write(md_dir.join("intro.md"), "# Intro").unwrap();

        let served = serve_path(temp_dir.path(), "/md/ocaml/intro.md", 4242);
        assert_eq!(served.status, 200);
        assert_eq!(served.body, b"# Intro");
    }

    #[test]
    fn test_serve_path_decodes_escaped_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let slides = temp_dir.path().join("slides");
        fs::create_dir_all(&slides).unwrap();
        fs::write(slides.join("ocaml-my deck.html"), "<body>deck</body>").unwrap();

        let served = serve_path(temp_dir.path(), "/slides/ocaml-my%20deck.html", 1);
        assert_eq!(served.status, 200);
        assert!(String::from_utf8(served.body).unwrap().starts_with("<body>deck"));
        assert_eq!(
            serve_path(temp_dir.path(), "/slides/%2E%2E/%2E%2E/etc/passwd", 1).status,
            403
        );
    }

    #[test]
    fn test_serve_path_missing_and_forbidden() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        assert_eq!(serve_path(temp_dir.path(), "/nope.html", 1).status, 404);
        assert_eq!(serve_path(temp_dir.path(), "/../secret", 1).status, 403);
    }

    #[test]
    fn test_response_carries_private_network_header() {
        let response = into_response(ServedFile::text(200, "ok"));
        let has_header = response.headers().iter().any(|h| {
            h.field.equiv(PRIVATE_NETWORK_HEADER) && h.value.as_str() == "true"
        });
        assert!(has_header);
        assert_eq!(response.status_code(), StatusCode(200));
    }

    #[test]
    fn test_live_reload_clients_get_write_timeout() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let live_reload = LiveReload::start(port).unwrap();

        let (mut client, _) =
            tungstenite::connect(format!("ws://127.0.0.1:{}", port)).expect("Failed to connect");
        for _ in 0..100 {
            if live_reload.client_count() == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(live_reload.client_count(), 1);

        let timeout = live_reload.clients.lock()[0]
            .get_ref()
            .write_timeout()
            .unwrap();
        assert_eq!(timeout, Some(WRITE_TIMEOUT));

        live_reload.broadcast();
        assert_eq!(
            client.read().unwrap(),
            Message::Text(RELOAD_MESSAGE.to_string())
        );
        assert_eq!(live_reload.client_count(), 1);
    }

    #[test]
    fn test_broadcast_without_clients() {
        let live_reload = LiveReload::default();
        live_reload.broadcast();
        assert_eq!(live_reload.client_count(), 0);
    }
}
