//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DB_PATH` | `./folio.db` |
//! | `DB_MODE` | `0600` (octal) |
//! | `STORAGE_PATH` | `./storage` |
//! | `HOST` | `0.0.0.0` |
//! | `REST_PORT` | `8080` |
//! | `TRANSFER_PORT` | `5001` |
//! | `PANDOC_PATH` | `pandoc` |
//! | `MAX_UPLOAD_BYTES` | 1 GiB |
//!
//! An empty variable counts as unset.

use std::path::PathBuf;
use std::str::FromStr;

use folio_core::{defaults, ConnectParams, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub db_mode: u32,
    pub storage_path: PathBuf,
    pub host: String,
    pub rest_port: u16,
    pub transfer_port: u16,
    pub pandoc_path: String,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(defaults::DB_PATH),
            db_mode: defaults::DB_MODE,
            storage_path: PathBuf::from(defaults::STORAGE_PATH),
            host: defaults::HOST.to_string(),
            rest_port: defaults::REST_PORT,
            transfer_port: defaults::TRANSFER_PORT,
            pandoc_path: defaults::PANDOC_PATH.to_string(),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let base = Self::default();

        let db_mode = match get("DB_MODE") {
            Some(raw) => u32::from_str_radix(raw.trim().trim_start_matches("0o"), 8)
                .map_err(|_| Error::Config(format!("DB_MODE must be octal, got {:?}", raw)))?,
            None => base.db_mode,
        };

        Ok(Self {
            db_path: get("DB_PATH").map(PathBuf::from).unwrap_or(base.db_path),
            db_mode,
            storage_path: get("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(base.storage_path),
            host: get("HOST").unwrap_or(base.host),
            rest_port: parse_or("REST_PORT", get("REST_PORT"), base.rest_port)?,
            transfer_port: parse_or("TRANSFER_PORT", get("TRANSFER_PORT"), base.transfer_port)?,
            pandoc_path: get("PANDOC_PATH").unwrap_or(base.pandoc_path),
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                get("MAX_UPLOAD_BYTES"),
                base.max_upload_bytes,
            )?,
        })
    }

    pub fn rest_addr(&self) -> String {
        format!("{}:{}", self.host, self.rest_port)
    }

    pub fn transfer_addr(&self) -> String {
        format!("{}:{}", self.host, self.transfer_port)
    }

    /// Address the REST layer dials to reach its own transfer server.
    pub fn transfer_client_addr(&self) -> String {
        let host = match self.host.as_str() {
            "0.0.0.0" | "" => "127.0.0.1",
            "::" => "::1",
            other => other,
        };
        if host.contains(':') {
            format!("[{}]:{}", host, self.transfer_port)
        } else {
            format!("{}:{}", host, self.transfer_port)
        }
    }

    pub fn connect_params(&self) -> ConnectParams {
        ConnectParams::new(self.db_path.clone()).with_mode(self.db_mode)
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has invalid value {:?}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rest_addr(), "0.0.0.0:8080");
        assert_eq!(config.transfer_addr(), "0.0.0.0:5001");
        assert_eq!(config.db_mode, 0o600);
    }

    #[test]
    fn test_overrides_applied() {
        let config = load(&[
            ("DB_PATH", "/var/lib/folio/folio.db"),
            ("DB_MODE", "0640"),
            ("STORAGE_PATH", "/srv/files"),
            ("HOST", "127.0.0.1"),
            ("REST_PORT", "9000"),
            ("TRANSFER_PORT", "9001"),
            ("PANDOC_PATH", "/usr/local/bin/pandoc"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/folio/folio.db"));
        assert_eq!(config.db_mode, 0o640);
        assert_eq!(config.storage_path, PathBuf::from("/srv/files"));
        assert_eq!(config.rest_addr(), "127.0.0.1:9000");
        assert_eq!(config.transfer_client_addr(), "127.0.0.1:9001");
        assert_eq!(config.pandoc_path, "/usr/local/bin/pandoc");
    }

    #[test]
    fn test_empty_value_falls_back() {
        let config = load(&[("REST_PORT", ""), ("HOST", "  ")]).unwrap();
        assert_eq!(config.rest_port, 8080);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let err = load(&[("REST_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("REST_PORT"));
    }

    #[test]
    fn test_invalid_mode_is_config_error() {
        let err = load(&[("DB_MODE", "0999")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_wildcard_host_dials_loopback() {
        let config = load(&[("HOST", "::")]).unwrap();
        assert_eq!(config.transfer_client_addr(), "[::1]:5001");
    }

    #[test]
    fn test_connect_params_carry_mode() {
        let config = load(&[("DB_MODE", "0o644")]).unwrap();
        let params = config.connect_params();
        assert_eq!(params.mode, 0o644);
        assert_eq!(params.path, PathBuf::from("./folio.db"));
    }
}
