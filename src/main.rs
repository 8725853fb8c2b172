use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pypi_mirror::config::{DEFAULT_INDEX_URL, DEFAULT_PACKAGE, MirrorConfig};
use pypi_mirror::mirror::Mirror;

#[derive(Parser)]
#[command(name = "pypi-mirror")]
#[command(version, about = "Mirror new PyPI releases into pyproject.toml and README.md")]
struct Cli {
    /// Repository holding pyproject.toml and README.md
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Upstream package to mirror
    #[arg(long, default_value = DEFAULT_PACKAGE)]
    package: String,

    /// Base URL of the package index
    #[arg(long, default_value = DEFAULT_INDEX_URL)]
    index_url: String,

    /// Run even if the mirrored files have uncommitted changes
    #[arg(long)]
    allow_dirty: bool,
}

impl From<Cli> for MirrorConfig {
    fn from(cli: Cli) -> Self {
        Self {
            root: cli.root,
            package: cli.package,
            index_url: cli.index_url,
            allow_dirty: cli.allow_dirty,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config: MirrorConfig = cli.into();
    let summary = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async { Mirror::new(config).run().await })?;

    info!(
        "Done: {} committed, {} without changes",
        summary.committed().count(),
        summary.skipped().count()
    );
    Ok(())
}
