use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Items per page when fetching playlist contents.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum track ids per add-tracks call (remote API limit).
    #[serde(default = "default_max_batch")]
    pub max_batch_size: usize,

    /// Attempts per remote call. 1 means a single attempt, no retry.
    #[serde(default = "default_max_retries")]
    pub max_retries_on_error: u32,
}

fn default_redirect_uri() -> String { "http://127.0.0.1:8080/callback".into() }
fn default_bind_addr() -> String { "0.0.0.0:8080".into() }
fn default_static_dir() -> PathBuf { "static".into() }
fn default_log_dir() -> PathBuf { "/var/log/playlist-backup".into() }
fn default_page_size() -> usize { 100 }
fn default_max_batch() -> usize { 100 }
fn default_max_retries() -> u32 { 1 }

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.client_id.is_empty(), "client_id must be set");
        anyhow::ensure!(!self.client_secret.is_empty(), "client_secret must be set");
        anyhow::ensure!(!self.redirect_uri.is_empty(), "redirect_uri must be set");
        anyhow::ensure!(self.page_size > 0, "page_size must be positive");
        anyhow::ensure!(self.max_batch_size > 0, "max_batch_size must be positive");
        anyhow::ensure!(
            self.max_retries_on_error > 0,
            "max_retries_on_error must be at least 1"
        );
        Ok(())
    }
}
