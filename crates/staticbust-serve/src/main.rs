//! staticbust-serve - serve a directory behind content-hashed URLs
//!
//! Configuration comes from `--config <file>` (a `[server]` TOML section) or
//! the `STATICBUST_*` environment variables, then command-line overrides.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use staticbust::ServerConfig;

mod serve;

#[derive(Parser)]
#[command(name = "staticbust-serve")]
#[command(about = "Serve static files with content-hash cache busting")]
#[command(version)]
struct Cli {
    /// TOML config file with a [server] section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Primary directory to serve
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Alternate directory, searched before the primary one
    #[arg(long)]
    alt_dir: Option<PathBuf>,

    /// URL prefix stripped before filesystem lookup (e.g. /static)
    #[arg(long)]
    root: Option<String>,

    /// Redirect directories to dir/ and files away from file/
    #[arg(long)]
    redirect_trailing_slash: bool,

    /// Serve plain URLs without content hashes
    #[arg(long)]
    no_hashing: bool,
}

impl Cli {
    fn into_config(self) -> Result<(ServerConfig, SocketAddr)> {
        let mut config = ServerConfig::load(self.config.as_deref())
            .context("Failed to load configuration")?;

        if let Some(dir) = self.dir {
            config.dir = dir;
        }
        if self.alt_dir.is_some() {
            config.alt_dir = self.alt_dir;
        }
        if let Some(root) = self.root {
            config.root = root;
        }
        if self.redirect_trailing_slash {
            config.redirect_trailing_slash = true;
        }
        if self.no_hashing {
            config.hashing = false;
        }

        Ok((config, self.listen))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let (config, listen) = cli.into_config()?;
    serve::run(config, listen).await
}
