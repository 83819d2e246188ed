//! Server configuration, loaded from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use sealbox_model::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Registered data store type to back the virtual data store.
    pub data_store_type: String,

    /// Registered key store type the virtual key store fans out to.
    pub key_store_type: String,

    /// Directory for location-based key stores; each backend gets its
    /// own subdirectory.
    pub key_store_location: Option<PathBuf>,

    /// Number of backing key stores the virtual key store fans out to.
    pub key_store_count: usize,

    /// Shares needed to reconstruct a data key.
    pub key_store_threshold: usize,

    /// Bit width of the secret-sharing prime field.
    pub share_field_bits: usize,

    /// PEM file with the RSA public key used to create the `root`
    /// principal on first run.
    pub root_public_key_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8200".parse().expect("valid default address"),
            data_store_type: sealbox_vds::registry::IN_MEMORY_DATA_STORE_TYPE.to_string(),
            key_store_type: sealbox_vks::registry::IN_MEMORY_KEY_STORE_TYPE.to_string(),
            key_store_location: None,
            key_store_count: 3,
            key_store_threshold: 2,
            share_field_bits: 2048,
            root_public_key_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// the defaults above.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::BadConfig(format!("invalid BIND_ADDRESS: {raw}")))?,
            Err(_) => defaults.bind_address,
        };

        let data_store_type =
            std::env::var("DATA_STORE_TYPE").unwrap_or(defaults.data_store_type);
        let key_store_type = std::env::var("KEY_STORE_TYPE").unwrap_or(defaults.key_store_type);
        let key_store_location = std::env::var("KEY_STORE_LOCATION").ok().map(PathBuf::from);

        let key_store_count = parse_env("KEY_STORE_COUNT", defaults.key_store_count)?;
        let key_store_threshold =
            parse_env("KEY_STORE_THRESHOLD", defaults.key_store_threshold)?;
        let share_field_bits = parse_env("SHARE_FIELD_BITS", defaults.share_field_bits)?;

        if key_store_threshold == 0 || key_store_threshold > key_store_count {
            return Err(Error::BadConfig(format!(
                "KEY_STORE_THRESHOLD {key_store_threshold} is not within 1..={key_store_count}"
            )));
        }

        let root_public_key_path = std::env::var("ROOT_INIT_PUB_KEY").ok().map(PathBuf::from);

        Ok(Self {
            bind_address,
            data_store_type,
            key_store_type,
            key_store_location,
            key_store_count,
            key_store_threshold,
            share_field_bits,
            root_public_key_path,
        })
    }
}

fn parse_env(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| Error::BadConfig(format!("invalid {name}: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data_store_type, "InMemoryDataStore");
        assert_eq!(config.key_store_type, "InMemoryKeyStore");
        assert_eq!(config.key_store_count, 3);
        assert_eq!(config.key_store_threshold, 2);
        assert_eq!(config.share_field_bits, 2048);
        assert!(config.root_public_key_path.is_none());
    }
}
