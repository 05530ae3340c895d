//! Server configuration from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use rand::RngCore;
use tracing::warn;

use umapic_core::defaults::{MAX_BODY_BYTES, SERVER_PORT, UPLOAD_URL_EXPIRES_SECS};
use umapic_core::{Error, Result};

/// Which record store the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(Error::Config(format!(
                "STORE_BACKEND must be postgres or memory, got {other}"
            ))),
        }
    }
}

/// Settings read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub bucket_name: String,
    /// Optional S3-compatible endpoint (MinIO, LocalStack).
    pub s3_endpoint: Option<String>,
    /// Prefix for public photo URLs; ends with `/`.
    pub photo_base_url: String,
    pub upload_url_expires: Duration,
    pub cursor_secret: Vec<u8>,
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("store_backend", &self.store_backend)
            .field("bucket_name", &self.bucket_name)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("photo_base_url", &self.photo_base_url)
            .field("upload_url_expires", &self.upload_url_expires)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", var("PORT"), SERVER_PORT)?;

        let store_backend = match var("STORE_BACKEND") {
            Some(raw) => StoreBackend::parse(&raw)?,
            None => StoreBackend::Postgres,
        };
        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(Error::Config(
                "DATABASE_URL is required when STORE_BACKEND=postgres".to_string(),
            ));
        }

        let bucket_name = var("BUCKET_NAME")
            .ok_or_else(|| Error::Config("BUCKET_NAME is required".to_string()))?;
        let mut photo_base_url = var("PHOTO_BASE_URL")
            .unwrap_or_else(|| format!("https://{bucket_name}.s3.amazonaws.com/"));
        if !photo_base_url.ends_with('/') {
            photo_base_url.push('/');
        }

        let upload_url_expires = Duration::from_secs(parse_or(
            "UPLOAD_URL_EXPIRES_SECS",
            var("UPLOAD_URL_EXPIRES_SECS"),
            UPLOAD_URL_EXPIRES_SECS,
        )?);

        let cursor_secret = match var("CURSOR_SECRET") {
            Some(secret) => secret.into_bytes(),
            None => {
                warn!(
                    subsystem = "config",
                    "CURSOR_SECRET not set; using a per-process secret, cursors will not survive restarts"
                );
                let mut secret = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                secret
            }
        };

        let max_body_bytes = parse_or("MAX_BODY_BYTES", var("MAX_BODY_BYTES"), MAX_BODY_BYTES)?;

        Ok(Self {
            host,
            port,
            store_backend,
            database_url,
            bucket_name,
            s3_endpoint: var("S3_ENDPOINT_URL"),
            photo_base_url,
            upload_url_expires,
            cursor_secret,
            max_body_bytes,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid HOST/PORT: {e}")))
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{name} is not a valid value: {raw}"))),
    }
}
