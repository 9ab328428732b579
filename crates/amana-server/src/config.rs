use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Upload secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub object_dir: PathBuf,
    pub public_url: String,
    pub upload_secret: String,
    pub upload_ttl: Duration,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let upload_secret = var("AMANA_UPLOAD_SECRET").unwrap_or_default();
        if upload_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&upload_secret.as_str()) {
            bail!("AMANA_UPLOAD_SECRET is unset or still a placeholder; set it in .env");
        }

        let host = var("AMANA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("AMANA_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("AMANA_PORT must be a port number")?;
        let upload_ttl_secs: u64 = var("AMANA_UPLOAD_TTL_SECS")
            .unwrap_or_else(|| "900".into())
            .parse()
            .context("AMANA_UPLOAD_TTL_SECS must be a number of seconds")?;
        let seed_demo = match var("AMANA_SEED_DEMO").as_deref() {
            None | Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => bail!("AMANA_SEED_DEMO must be true or false, got '{}'", other),
        };

        Ok(Self {
            public_url: var("AMANA_PUBLIC_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            host,
            port,
            db_path: var("AMANA_DB_PATH")
                .unwrap_or_else(|| "amana.db".into())
                .into(),
            object_dir: var("AMANA_OBJECT_DIR")
                .unwrap_or_else(|| "./object-storage".into())
                .into(),
            upload_secret,
            upload_ttl: Duration::from_secs(upload_ttl_secs),
            seed_demo,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
