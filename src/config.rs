//! Environment-driven configuration shared by the backend and the dashboard.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Authenticator, BypassAuthenticator, StaticAuthenticator};
use crate::data::DEFAULT_IDENTIFIER_COLUMN;
use crate::error::{ConfigError, StorageError};
use crate::storage::{BlobStore, HttpBlobStore, LocalBlobStore, MemoryBlobStore, RetryPolicy};
use crate::tasks::PipelineSettings;

const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";
const AWS_S3_ENDPOINT: &str = "https://s3.amazonaws.com";

/// Which [`BlobStore`] implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    S3,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub bucket: String,

    pub backend_host: String,
    pub backend_port: u16,
    /// Tokio worker threads for the backend runtime.
    pub backend_workers: usize,
    /// Base URL the dashboard uses to reach the backend.
    pub backend_access_url: String,

    pub frontend_retry_count: u32,
    pub frontend_retry_delay: Duration,
    pub frontend_poll_interval: Duration,

    pub storage: StorageKind,
    pub storage_root: PathBuf,
    pub s3_endpoint_url: String,
    pub s3_auth_bearer: Option<String>,

    pub identifier_column: String,
    pub temp_dir: Option<PathBuf>,

    pub auth_bypass: bool,
    pub auth_credentials: Option<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            bucket: "scratch".to_string(),
            backend_host: "0.0.0.0".to_string(),
            backend_port: 8001,
            backend_workers: 1,
            backend_access_url: "http://localhost:8001".to_string(),
            frontend_retry_count: 5,
            frontend_retry_delay: Duration::from_secs(2),
            frontend_poll_interval: Duration::from_secs(2),
            storage: StorageKind::Local,
            storage_root: PathBuf::from("./data"),
            s3_endpoint_url: AWS_S3_ENDPOINT.to_string(),
            s3_auth_bearer: None,
            identifier_column: DEFAULT_IDENTIFIER_COLUMN.to_string(),
            temp_dir: None,
            auth_bypass: false,
            auth_credentials: None,
        }
    }
}

impl Config {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);
        let mut config = Self::default();

        if let Some(level) = env.string("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(bucket) = env.string("S3_BUCKET") {
            config.bucket = bucket;
        }

        if let Some(host) = env.string("BACKEND_HOST") {
            config.backend_host = host;
        }
        if let Some(port) = env.u16("BACKEND_PORT")? {
            config.backend_port = port;
        }
        if let Some(workers) = env.usize("BACKEND_N_WORKERS")? {
            if workers == 0 {
                return Err(ConfigError::Invalid {
                    name: "BACKEND_N_WORKERS",
                    message: "must be at least 1".to_string(),
                });
            }
            config.backend_workers = workers;
        }
        config.backend_access_url = env
            .string("BACKEND_ACCESS_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", config.backend_port));

        if let Some(count) = env.u32("FRONTEND_RETRY_COUNT")? {
            config.frontend_retry_count = count;
        }
        if let Some(secs) = env.u64("FRONTEND_RETRY_DELAY_SECONDS")? {
            config.frontend_retry_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = env.u64("FRONTEND_POLL_INTERVAL_SECONDS")? {
            config.frontend_poll_interval = Duration::from_secs(secs);
        }

        if let Some(kind) = env.string("STORAGE_BACKEND") {
            config.storage = parse_storage_kind("STORAGE_BACKEND", &kind)?;
        }
        if let Some(root) = env.string("STORAGE_ROOT") {
            config.storage_root = PathBuf::from(root);
        }
        if let Some(url) = env.string("S3_ENDPOINT_URL") {
            config.s3_endpoint_url = url;
        }
        if env.bool("USE_LOCALSTACK")?.unwrap_or(false) {
            config.storage = StorageKind::S3;
            config.s3_endpoint_url = LOCALSTACK_ENDPOINT.to_string();
        }
        config.s3_auth_bearer = env.string("S3_AUTH_BEARER");

        if let Some(column) = env.string("IDENTIFIER_COLUMN") {
            config.identifier_column = column;
        }
        config.temp_dir = env.string("TEMP_DIR").map(PathBuf::from);

        if let Some(bypass) = env.bool("AUTH_BYPASS")? {
            config.auth_bypass = bypass;
        }
        config.auth_credentials = match (env.string("AUTH_USERNAME"), env.string("AUTH_PASSWORD")) {
            (Some(user), Some(password)) => Some((user, password)),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "AUTH_USERNAME",
                    message: "AUTH_USERNAME and AUTH_PASSWORD must be set together".to_string(),
                })
            }
        };

        Ok(config)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = if self.backend_host.contains(':') && !self.backend_host.starts_with('[') {
            format!("[{}]", self.backend_host)
        } else {
            self.backend_host.clone()
        };
        format!("{host}:{}", self.backend_port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: "BACKEND_HOST",
                message: format!("'{}' is not an IP address: {e}", self.backend_host),
            })
    }

    pub fn build_store(&self) -> Result<Arc<dyn BlobStore>, StorageError> {
        let store: Arc<dyn BlobStore> = match self.storage {
            StorageKind::Local => {
                let store = LocalBlobStore::new(&self.storage_root);
                log::info!("Objects are kept under {}", store.root().display());
                Arc::new(store)
            }
            StorageKind::Memory => Arc::new(MemoryBlobStore::new()),
            StorageKind::S3 => {
                let store = HttpBlobStore::new(
                    &self.s3_endpoint_url,
                    self.s3_auth_bearer.clone(),
                    RetryPolicy::default(),
                )?;
                log::info!("Object store endpoint: {}", store.endpoint());
                Arc::new(store)
            }
        };
        log::info!("Using {} blob store, bucket '{}'", store.name(), self.bucket);
        Ok(store)
    }

    pub fn authenticator(&self) -> Arc<dyn Authenticator> {
        if self.auth_bypass {
            log::warn!("AUTH_BYPASS is set: every login will be accepted");
            return Arc::new(BypassAuthenticator);
        }
        match &self.auth_credentials {
            Some((user, password)) => Arc::new(StaticAuthenticator::new(user, password)),
            None => {
                log::warn!("No credentials configured: every login will be rejected");
                Arc::new(StaticAuthenticator::deny_all())
            }
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            bucket: self.bucket.clone(),
            identifier_column: self.identifier_column.clone(),
            temp_dir: self.temp_dir.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Variable parsing
// ---------------------------------------------------------------------------

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn parsed<T>(&self, name: &'static str, kind: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<T>().map(Some).map_err(|e| ConfigError::Invalid {
            name,
            message: format!("must be a {kind}: {e}"),
        })
    }

    fn u16(&self, name: &'static str) -> Result<Option<u16>, ConfigError> {
        self.parsed(name, "u16")
    }

    fn u32(&self, name: &'static str) -> Result<Option<u32>, ConfigError> {
        self.parsed(name, "u32")
    }

    fn u64(&self, name: &'static str) -> Result<Option<u64>, ConfigError> {
        self.parsed(name, "u64")
    }

    fn usize(&self, name: &'static str) -> Result<Option<usize>, ConfigError> {
        self.parsed(name, "usize")
    }

    fn bool(&self, name: &'static str) -> Result<Option<bool>, ConfigError> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        parse_bool(name, &v).map(Some)
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            message: "must be a boolean (true/false/1/0)".to_string(),
        }),
    }
}

fn parse_storage_kind(name: &'static str, value: &str) -> Result<StorageKind, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(StorageKind::Local),
        "s3" => Ok(StorageKind::S3),
        "memory" => Ok(StorageKind::Memory),
        _ => Err(ConfigError::Invalid {
            name,
            message: format!("must be one of: local, s3, memory (got {value})"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |name| map.get(name).cloned())
    }

    #[test]
    fn defaults_match_the_documented_table() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bucket, "scratch");
        assert_eq!(c.backend_port, 8001);
        assert_eq!(c.backend_workers, 1);
        assert_eq!(c.backend_access_url, "http://localhost:8001");
        assert_eq!(c.frontend_retry_count, 5);
        assert_eq!(c.frontend_retry_delay, Duration::from_secs(2));
        assert_eq!(c.storage, StorageKind::Local);
        assert_eq!(c.identifier_column, "SYMBOL");
        assert!(!c.auth_bypass);
        assert_eq!(c.bind_addr().unwrap().to_string(), "0.0.0.0:8001");
    }

    #[test]
    fn access_url_follows_the_port() {
        let c = config(&[("BACKEND_PORT", "9000")]).unwrap();
        assert_eq!(c.backend_access_url, "http://localhost:9000");
        let c = config(&[("BACKEND_PORT", "9000"), ("BACKEND_ACCESS_URL", "http://be:1")]).unwrap();
        assert_eq!(c.backend_access_url, "http://be:1");
    }

    #[test]
    fn blank_values_are_unset() {
        let c = config(&[("S3_BUCKET", "   "), ("BACKEND_PORT", "")]).unwrap();
        assert_eq!(c.bucket, "scratch");
        assert_eq!(c.backend_port, 8001);
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = config(&[("BACKEND_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BACKEND_PORT", .. }));
        assert!(config(&[("BACKEND_N_WORKERS", "0")]).is_err());
        assert!(config(&[("USE_LOCALSTACK", "maybe")]).is_err());
    }

    #[test]
    fn localstack_forces_the_s3_store() {
        let c = config(&[("USE_LOCALSTACK", "true"), ("STORAGE_BACKEND", "local")]).unwrap();
        assert_eq!(c.storage, StorageKind::S3);
        assert_eq!(c.s3_endpoint_url, LOCALSTACK_ENDPOINT);
    }

    #[test]
    fn storage_kind_parses() {
        assert_eq!(
            config(&[("STORAGE_BACKEND", "Memory")]).unwrap().storage,
            StorageKind::Memory
        );
        assert!(config(&[("STORAGE_BACKEND", "gcs")]).is_err());
    }

    #[test]
    fn credentials_come_in_pairs() {
        assert!(config(&[("AUTH_USERNAME", "ana")]).is_err());
        let c = config(&[("AUTH_USERNAME", "ana"), ("AUTH_PASSWORD", "pw")]).unwrap();
        let auth = c.authenticator();
        assert!(auth.authenticate("ana", "pw").unwrap().is_some());
    }

    #[test]
    fn ipv6_hosts_bind() {
        let c = config(&[("BACKEND_HOST", "::1")]).unwrap();
        assert_eq!(c.bind_addr().unwrap().to_string(), "[::1]:8001");
    }
}
