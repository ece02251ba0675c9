// ABOUTME: Main entry point for the tutorial-slides program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use std::fs;
use std::path::PathBuf;
use tutorial_slides::{PresentationConfig, SiteConfig, SlideSet, WatchConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every Markdown tutorial into the slides directory
    Build(BuildArgs),

    /// Build, serve the site and live-reload on changes
    Serve(ServeArgs),

    /// Print the presentation runtime init script
    RuntimeConfig(RuntimeConfigArgs),
}

#[derive(Args)]
struct SiteArgs {
    /// Site root holding the templates, md/ and slides/
    #[arg(long)]
    root: Option<PathBuf>,

    /// Slide set as TEMPLATE:DIR, repeatable (defaults to the ocaml, prolog and racket tracks)
    #[arg(long = "set", value_name = "TEMPLATE:DIR")]
    sets: Vec<SlideSet>,
}

impl SiteArgs {
    fn site_config(&self) -> SiteConfig {
        SiteConfig::from_env_with_root(self.root.clone()).with_slide_sets(self.sets.clone())
    }
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    site: SiteArgs,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    site: SiteArgs,

    /// Port for the HTTP server
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Port for the live-reload WebSocket
    #[arg(long, default_value_t = 35729)]
    livereload_port: u16,

    /// Debounce time for file changes in milliseconds
    #[arg(long, default_value_t = 200)]
    debounce_ms: u64,
}

#[derive(Args)]
struct RuntimeConfigArgs {
    /// Jupyter kernel name
    #[arg(long, default_value = "racket")]
    kernel: String,

    /// CodeMirror mode for executable cells
    #[arg(long, default_value = "text/x-scheme")]
    mode: String,

    /// CodeMirror theme
    #[arg(long, default_value = "monokai")]
    theme: String,

    /// Host of the code execution service
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port of the code execution service
    #[arg(long, default_value_t = 16789)]
    kernel_port: u16,

    /// Write the script here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Build(args) => {
            let config = args.site.site_config();
            let report = runtime()?.block_on(tutorial_slides::build_site(&config))?;
            if report.is_clean() {
                info!("Slides generated in {:?}", config.output_dir);
            } else {
                warn!(
                    "{} slide page(s) could not be written to {:?}",
                    report.failed.len(),
                    config.output_dir
                );
            }
            Ok(())
        }
        Commands::Serve(args) => {
            let config = WatchConfig {
                site: args.site.site_config(),
                port: args.port,
                livereload_port: args.livereload_port,
                debounce_ms: args.debounce_ms,
            };
            let runtime = runtime()?;
            tutorial_slides::serve(config, runtime.handle())?;
            Ok(())
        }
        Commands::RuntimeConfig(args) => {
            let config = PresentationConfig {
                kernel: args.kernel,
                editor_mode: args.mode,
                editor_theme: args.theme,
                host: args.host,
                port: args.kernel_port,
            };
            let script = config.render_init_script()?;
            match args.output {
                Some(path) => {
                    fs::write(&path, script)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Runtime config written to {:?}", path);
                }
                None => print!("{}", script),
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(command) = cli.command else {
        println!("No command specified. Use --help for usage information.");
        return;
    };

    if let Err(e) = run(command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
