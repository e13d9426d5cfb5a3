//! Layered views CLI
//!
//! Usage:
//!   layered-views [OPTIONS] <REFERENCE>
//!
//! Options:
//!   --views <DIR>             Shared views directory [default: .]
//!   --context <NAME=DIR>      Register a context (repeatable)
//!   --in <CONTEXT>            Render context, e.g. `blog` or `/admin/blog`
//!   --data <FILE>             JSON file with the render data
//!   --config <FILE>           Renderer configuration (TOML format)
//!   --hot-reload              Reload views before rendering
//!   --log <LEVEL>             Log level when RUST_LOG is unset [default: warn]
//!   -h, --help                Print help

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use layered_views::{DirFs, Error, Renderer, RendererConfig};

#[derive(Parser)]
#[command(name = "layered-views")]
#[command(about = "Render layered HTML views")]
struct Cli {
    /// Template reference: [base=>][layout=>]page[#fragment] or #component
    reference: String,

    /// Shared views directory
    #[arg(long, default_value = ".")]
    views: PathBuf,

    /// Context views as NAME=DIR
    #[arg(long = "context", value_parser = parse_context)]
    contexts: Vec<(String, PathBuf)>,

    /// Context to render in
    #[arg(long = "in", default_value = "")]
    render_in: String,

    /// JSON file with the render data
    #[arg(long)]
    data: Option<PathBuf>,

    /// Renderer configuration (TOML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reload views before rendering
    #[arg(long)]
    hot_reload: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log: String,
}

fn parse_context(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, dir)) if !dir.is_empty() => Ok((name.to_string(), PathBuf::from(dir))),
        _ => Err(format!("expected NAME=DIR, got {:?}", arg)),
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => match RendererConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => RendererConfig::default(),
    };
    let config = if cli.hot_reload {
        config.with_hot_reload(true)
    } else {
        config
    };

    // Read data
    let data = match &cli.data {
        Some(path) => match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
        {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading data '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Value::Null,
    };

    if let Err(e) = run(&cli, config, &data) {
        match &e {
            Error::Create(layered_views::CreateError::Load(load)) => {
                eprintln!("Error: {}", load.report())
            }
            Error::Context(layered_views::ContextError::Load { source, .. }) => {
                eprintln!("Error: {}", source.report())
            }
            _ => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli, config: RendererConfig, data: &Value) -> Result<(), Error> {
    let renderer = Renderer::new(Arc::new(DirFs::new(&cli.views)), config)?;
    for (name, dir) in &cli.contexts {
        renderer.add_context(name, Arc::new(DirFs::new(dir)))?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    renderer.render(&mut out, &cli.render_in, &cli.reference, data)?;
    out.flush().map_err(layered_views::RenderError::Write)?;
    Ok(())
}
