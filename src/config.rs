use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OMDB_BASE: &str = "http://www.omdbapi.com/";
const DEFAULT_WATCHED_PATH: &str = "data/watched.json";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3146";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub watched_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let omdb_api_key = env::var("OMDB_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("OMDB_API_KEY must be set"))?;
        let omdb_base_url =
            env::var("OMDB_BASE_URL").unwrap_or_else(|_| DEFAULT_OMDB_BASE.to_string());
        let watched_path = env::var("POPCORN_WATCHED_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_WATCHED_PATH));
        let bind_addr = env::var("POPCORN_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("POPCORN_BIND_ADDR is not a valid socket address")?;
        let timeout_secs = match env::var("POPCORN_HTTP_TIMEOUT_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .context("POPCORN_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            omdb_api_key,
            omdb_base_url,
            watched_path,
            bind_addr,
            http_timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }
}
