use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

#[derive(Debug)]
pub struct Config {
    // http server configuration
    /// Port for the API HTTP server
    pub api_port: u16,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // auth
    /// key signing bearer tokens
    pub token_key: Zeroizing<Vec<u8>>,
    /// lifetime of issued bearer tokens
    pub token_ttl: Duration,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
