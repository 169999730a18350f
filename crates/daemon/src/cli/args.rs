pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "strongroom")]
#[command(about = "Sealed, encrypted, hierarchical secret store")]
#[command(version)]
pub struct Args {
    /// Daemon API to talk to (defaults to the configured api_port on localhost)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the strongroom state directory (defaults to ~/.strongroom)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
